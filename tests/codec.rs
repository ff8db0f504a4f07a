//! Black-box checks on the sign-magnitude integer codec, exercised through
//! the crate's public `codec` module rather than its internal unit tests.

use bsdelta::codec::{decode_int, encode_int};

fn roundtrip(x: i64) -> i64 {
    let mut buf = [0u8; 8];
    encode_int(x, &mut buf);
    decode_int(&buf)
}

#[test]
fn boundary_values_roundtrip() {
    for &x in &[0, 1, -1, i64::MAX, -(i64::MAX), 1 << 32, -(1i64 << 32)] {
        assert_eq!(roundtrip(x), x);
    }
}

#[test]
fn negative_encodes_with_sign_bit_on_last_byte() {
    let mut buf = [0u8; 8];
    encode_int(-1, &mut buf);
    assert_eq!(buf, [1, 0, 0, 0, 0, 0, 0, 0x80]);
}

#[test]
fn positive_encodes_as_plain_little_endian() {
    let mut buf = [0u8; 8];
    encode_int(300, &mut buf);
    assert_eq!(buf, [44, 1, 0, 0, 0, 0, 0, 0]);
}

#[quickcheck_macros::quickcheck]
fn involution_over_full_range(x: i64) -> bool {
    x == i64::MIN || roundtrip(x) == x
}
