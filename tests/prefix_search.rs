//! Correctness checks for `SuffixIndex::prefix_search` against a naive
//! reference implementation, plus the documented tie-break behavior.

use bsdelta::SuffixIndex;

fn naive_prefix_search(old: &[u8], needle: &[u8]) -> usize {
    (0..=old.len())
        .map(|i| old[i..].iter().zip(needle).take_while(|(a, b)| a == b).count())
        .max()
        .unwrap_or(0)
}

#[test]
fn matches_naive_search_on_varied_inputs() {
    let corpora: &[&[u8]] = &[
        b"abcabcabcxyzabc",
        b"the quick brown fox jumps over the lazy dog",
        b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        b"",
    ];
    let needles: &[&[u8]] = &[b"abc", b"xyz", b"quick", b"zzzzzz", b"a", b""];

    for &old in corpora {
        let index = SuffixIndex::build(old);
        for &needle in needles {
            let (pos, len) = index.prefix_search(old, needle, 0);
            assert_eq!(len, naive_prefix_search(old, needle), "old={old:?} needle={needle:?}");
            if len > 0 {
                assert_eq!(&old[pos - 1..pos - 1 + len], &needle[..len]);
            }
        }
    }
}

#[test]
fn offset_into_new_is_respected() {
    let old = b"hello world, hello rust";
    let index = SuffixIndex::build(old);
    let new = b"xxxxhello rust";
    let (pos, len) = index.prefix_search(old, new, 4);
    assert_eq!(&old[pos - 1..pos - 1 + len], &new[4..4 + len]);
    assert!(len >= b"hello rust".len());
}

#[test]
fn no_match_at_all_returns_zero_length() {
    let old = b"aaaaaaaaaa";
    let index = SuffixIndex::build(old);
    let (_, len) = index.prefix_search(old, b"zzzzz", 0);
    assert_eq!(len, 0);
}
