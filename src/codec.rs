//! Sign-magnitude-biased 64-bit integer codec used for every control and
//! offset field inside a patch (and nowhere else).
//!
//! Naive two's-complement encoding of a small negative number fills the
//! high bytes with `0xFF`, which defeats the bzip2 entropy coder downstream.
//! Splitting the value into a sign bit and a magnitude keeps the high byte
//! zero for small magnitudes of either sign.

use byteorder::{ByteOrder, LE};

/// Encodes a signed 64-bit integer into 8 little-endian bytes.
///
/// `x` non-negative is written verbatim; `x` negative is written as its
/// magnitude with the top bit of the last byte set.
#[inline]
pub fn encode_int(x: i64, buf: &mut [u8]) {
    debug_assert!(buf.len() == 8);
    if x < 0 {
        let magnitude = x.wrapping_neg() as u64;
        LE::write_u64(buf, magnitude | (1 << 63));
    } else {
        LE::write_u64(buf, x as u64);
    }
}

/// Decodes 8 little-endian bytes produced by [`encode_int`].
///
/// This is the involution described by the integer codec: decoding the
/// output of `encode_int` always recovers the original value, except for
/// the unrepresentable edge `x == i64::MIN`, whose magnitude does not fit
/// in a `u64` sign bit layout either way.
#[inline]
pub fn decode_int(buf: &[u8]) -> i64 {
    debug_assert!(buf.len() == 8);
    let y = LE::read_u64(buf);
    if y >> 63 == 0 {
        y as i64
    } else {
        (y & !(1 << 63)) as i64 * -1
    }
}
