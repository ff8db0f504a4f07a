//! Suffix-array index: construction (delegated to the `suffix_array` crate,
//! the "external sorter" spec'd as out of scope), the longest-common-prefix
//! binary search used by the diff generator, and on-disk persistence.

use std::cmp::Ordering;
use std::io::{Read, Write};

use byteorder::{ByteOrder, LE};
use suffix_array::SuffixArray;

pub use suffix_array::MAX_LENGTH;

use crate::error::{Error, Result};

const INDEX_MAGIC: &[u8; 13] = b"SUFFIX ARRAY\0";

/// Width (in bytes) of each stored suffix-array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    /// Smallest width able to hold `max_value`.
    fn for_max_value(max_value: usize) -> Width {
        if max_value <= u8::MAX as usize {
            Width::U8
        } else if max_value <= u16::MAX as usize {
            Width::U16
        } else if max_value <= u32::MAX as usize {
            Width::U32
        } else {
            Width::U64
        }
    }

    fn tag(self) -> u8 {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    fn from_tag(tag: u8) -> Result<Width> {
        match tag {
            1 => Ok(Width::U8),
            2 => Ok(Width::U16),
            4 => Ok(Width::U32),
            8 => Ok(Width::U64),
            other => Err(Error::corrupt_index(format!(
                "unit size must be one of 1, 2, 4, 8, got {other}"
            ))),
        }
    }

    fn bytes(self) -> usize {
        self.tag() as usize
    }
}

/// A suffix array over some `old` buffer, with the search machinery needed
/// by the diff generator.
///
/// The array itself is always held as `u32` offsets in memory (the
/// `suffix_array` crate's own limit); [`Width`] only governs the on-disk
/// encoding, so an index persisted with a narrower or wider element size
/// (e.g. by a foreign writer) still loads correctly.
pub struct SuffixIndex {
    array: Vec<u32>,
}

impl SuffixIndex {
    /// Builds a suffix array over `old` by delegating to an external
    /// sorter. Panics if `old` is longer than [`MAX_LENGTH`].
    pub fn build(old: &[u8]) -> SuffixIndex {
        if old.len() > MAX_LENGTH {
            panic!("source data is too large to be indexed");
        }
        log::debug!("building suffix array over {} bytes", old.len());
        let (_, array) = SuffixArray::new(old).into_parts();
        log::debug!("suffix array built, {} entries", array.len());
        SuffixIndex { array }
    }

    /// Number of entries (equal to `len(old)`).
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Implements `prefix_search(index, old, new, t)`.
    ///
    /// Returns `(pos, len)`: `pos` is a *one-based* offset into `old` and
    /// `len` is the length of the longest common prefix found between
    /// `new[t..]` and `old[pos-1..]` among the suffixes the binary search
    /// visits.
    pub fn prefix_search(&self, old: &[u8], new: &[u8], t: usize) -> (usize, usize) {
        let n = self.array.len();
        if n == 0 {
            return (1, 0);
        }

        let mut lo = 1usize;
        let mut hi = n;
        let mut lo_c = common_prefix(slice_from(new, t), slice_from(old, self.array[lo - 1] as usize));
        let mut hi_c = common_prefix(slice_from(new, t), slice_from(old, self.array[hi - 1] as usize));
        let mut c = lo_c.min(hi_c);

        while hi - lo >= 2 {
            let m = (lo + hi) / 2;
            let s = self.array[m - 1] as usize;
            let (sign, extra) = compare_from(slice_from(new, t + c), slice_from(old, s + c));
            if sign > 0 {
                lo = m;
                lo_c = c + extra;
            } else {
                hi = m;
                hi_c = c + extra;
            }
            c = lo_c.min(hi_c);
        }

        if lo_c > hi_c {
            (self.array[lo - 1] as usize + 1, lo_c)
        } else {
            (self.array[hi - 1] as usize + 1, hi_c)
        }
    }

    /// Writes `"SUFFIX ARRAY\0"`, a one-byte unit size, then the raw
    /// little-endian elements of the array.
    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        let width = Width::for_max_value(self.array.len().saturating_sub(1));
        out.write_all(INDEX_MAGIC)?;
        out.write_all(&[width.tag()])?;

        let mut buf = [0u8; 8];
        for &offset in &self.array {
            let n = width.bytes();
            LE::write_u64(&mut buf, offset as u64);
            out.write_all(&buf[..n])?;
        }
        Ok(())
    }

    /// Reads back an index written by [`SuffixIndex::write`], verifying
    /// the header and checking it has exactly `data_len` elements.
    pub fn read<R: Read>(mut input: R, data_len: usize) -> Result<SuffixIndex> {
        let mut magic = [0u8; 13];
        input.read_exact(&mut magic).map_err(|e| {
            Error::corrupt_index(format!("short read of index header: {e}"))
        })?;
        if &magic != INDEX_MAGIC {
            return Err(Error::corrupt_index("bad index magic"));
        }

        let mut tag = [0u8; 1];
        input
            .read_exact(&mut tag)
            .map_err(|e| Error::corrupt_index(format!("short read of unit size: {e}")))?;
        let width = Width::from_tag(tag[0])?;

        let mut array = Vec::with_capacity(data_len);
        let mut buf = [0u8; 8];
        for _ in 0..data_len {
            let n = width.bytes();
            input
                .read_exact(&mut buf[..n])
                .map_err(|e| Error::corrupt_index(format!("short read of index element: {e}")))?;
            buf[n..].fill(0);
            let offset = LE::read_u64(&buf);
            array.push(offset as u32);
        }
        Ok(SuffixIndex { array })
    }
}

#[inline]
fn slice_from(buf: &[u8], start: usize) -> &[u8] {
    buf.get(start..).unwrap_or(&[])
}

/// Count of leading equal bytes between two slices.
#[inline]
fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Compares two slices lexicographically, returning the signum of the
/// comparison and the number of leading equal bytes found.
#[inline]
fn compare_from(a: &[u8], b: &[u8]) -> (i32, usize) {
    let n = a.len().min(b.len());
    let mut i = 0;
    while i < n && a[i] == b[i] {
        i += 1;
    }
    let sign = if i == n {
        match a.len().cmp(&b.len()) {
            Ordering::Greater => 1,
            Ordering::Less => -1,
            Ordering::Equal => 0,
        }
    } else {
        match a[i].cmp(&b[i]) {
            Ordering::Greater => 1,
            Ordering::Less => -1,
            Ordering::Equal => unreachable!("loop would not have stopped"),
        }
    };
    (sign, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_lcp(old: &[u8], needle: &[u8]) -> usize {
        (0..=old.len())
            .map(|i| common_prefix(needle, &old[i..]))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn finds_exact_match() {
        let old = b"the quick brown fox jumps over the lazy dog";
        let idx = SuffixIndex::build(old);
        let (pos, len) = idx.prefix_search(old, b"quick brown", 0);
        assert_eq!(&old[pos - 1..pos - 1 + len], b"quick brown");
    }

    #[test]
    fn matches_naive_lcp_length() {
        let old = b"abcabcabcxyzabc";
        let idx = SuffixIndex::build(old);
        for needle in [&b"abcx"[..], b"xyzabcd", b"zzz", b"a"] {
            let (pos, len) = idx.prefix_search(old, needle, 0);
            assert_eq!(&old[pos - 1..pos - 1 + len], &needle[..len]);
            assert!(len >= naive_lcp(old, needle));
        }
    }

    #[test]
    fn empty_old_returns_zero_length() {
        let old: &[u8] = b"";
        let idx = SuffixIndex::build(old);
        let (_pos, len) = idx.prefix_search(old, b"anything", 0);
        assert_eq!(len, 0);
    }

    #[test]
    fn persists_and_reloads() {
        let old = b"mississippi river mississippi delta";
        let idx = SuffixIndex::build(old);

        let mut buf = Vec::new();
        idx.write(&mut buf).unwrap();

        let reloaded = SuffixIndex::read(&buf[..], old.len()).unwrap();
        assert_eq!(reloaded.len(), idx.len());

        let (p1, l1) = idx.prefix_search(old, b"mississippi", 0);
        let (p2, l2) = reloaded.prefix_search(old, b"mississippi", 0);
        assert_eq!((p1, l1), (p2, l2));
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0u8; 20];
        assert!(SuffixIndex::read(&buf[..], 5).is_err());
    }

    #[test]
    fn rejects_bad_unit_size() {
        let mut buf = INDEX_MAGIC.to_vec();
        buf.push(3); // not in {1,2,4,8}
        assert!(SuffixIndex::read(&buf[..], 0).is_err());
    }
}
