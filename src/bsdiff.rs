//! The diff generator: produces a sequence of control records (plus diff
//! and data payloads) that reconstruct `new` from `old` when applied.
//!
//! The algorithm is the classical bsdiff heuristic: scan `new` for
//! approximate matches against `old` via the suffix-array index, score
//! candidate matches against a "shifted old window" anchored at the
//! previous commit point, and extend the chosen match both forward and
//! backward with an overlap-resolution pass. It is deliberately greedy; it
//! does not minimize patch size and does not stream `old` or `new`.

use std::io::Write;

pub use bzip2::Compression;

use crate::container::{ContainerWriter, Format};
use crate::error::Result;
use crate::suffix::SuffixIndex;

/// Default buffer size for delta calculation.
pub const BUFFER_SIZE: usize = 16384;

/// The fixed tuning constant from the classical algorithm: a candidate
/// match is accepted once it beats the shifted-old-window score by more
/// than this many bytes.
const DISMATCH_THRESHOLD: usize = 8;

/// Default compression level.
pub const LEVEL: Compression = Compression::new(6);

/// Memory-saving bsdiff 4.x compatible delta compressor.
///
/// Builds (or reuses) a suffix array over `old` up front, then scans any
/// number of `new` buffers against it with [`Bsdiff::compare`].
pub struct Bsdiff<'s> {
    old: &'s [u8],
    index: SuffixIndex,
    level: Compression,
    bsize: usize,
}

impl<'s> Bsdiff<'s> {
    /// Builds a fresh suffix array over `old`.
    ///
    /// Panics if `old` is longer than [`crate::suffix::MAX_LENGTH`].
    pub fn new(old: &'s [u8]) -> Self {
        Bsdiff {
            old,
            index: SuffixIndex::build(old),
            level: LEVEL,
            bsize: BUFFER_SIZE,
        }
    }

    /// Reuses a previously built (or persisted) suffix array over `old`,
    /// avoiding reconstruction when diffing the same `old` repeatedly.
    pub fn with_index(old: &'s [u8], index: SuffixIndex) -> Self {
        Bsdiff {
            old,
            index,
            level: LEVEL,
            bsize: BUFFER_SIZE,
        }
    }

    /// Sets the bzip2 compression level used by the container's substreams
    /// (default is [`LEVEL`]).
    pub fn compression_level(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Sets the scratch buffer size used while computing diff bytes
    /// (`bs >= 128`, default is [`BUFFER_SIZE`]).
    pub fn buffer_size(mut self, mut bs: usize) -> Self {
        if bs < 128 {
            bs = 128;
        }
        self.bsize = bs;
        self
    }

    /// Diffs `new` against `old`, writing a patch of the given container
    /// `format` to `patch`. Returns the number of bytes written.
    pub fn compare<W: Write>(&self, new: &[u8], patch: W, format: Format) -> Result<u64> {
        log::debug!(
            "bsdiff: comparing old ({} bytes) to new ({} bytes), format={:?}",
            self.old.len(),
            new.len(),
            format
        );
        let mut container = ContainerWriter::open(patch, format, new.len() as u64, self.level)?;
        let mut ctx = Context::new(self.old, new, &self.index, self.bsize);
        ctx.run(&mut container)?;
        let written = container.close()?;
        log::debug!("bsdiff: wrote {written} bytes of patch ({} control records)", ctx.commits);
        Ok(written)
    }
}

/// Mutable scan state for one `compare` call.
struct Context<'s, 't, 'i> {
    old: &'s [u8],
    new: &'t [u8],
    index: &'i SuffixIndex,
    bsize: usize,

    scan: usize,
    pos: usize,
    len: usize,
    lastscan: usize,
    lastpos: usize,
    lastoffset: isize,
    commits: u64,
}

impl<'s, 't, 'i> Context<'s, 't, 'i> {
    fn new(old: &'s [u8], new: &'t [u8], index: &'i SuffixIndex, bsize: usize) -> Self {
        Context {
            old,
            new,
            index,
            bsize,
            scan: 0,
            pos: 0,
            len: 0,
            lastscan: 0,
            lastpos: 0,
            lastoffset: 0,
            commits: 0,
        }
    }

    fn run<W: Write>(&mut self, container: &mut ContainerWriter<W>) -> Result<()> {
        let old = self.old;
        let new = self.new;

        while self.scan < new.len() {
            let mut oldscore = 0usize;
            self.scan += self.len;
            let mut scsc = self.scan;

            while self.scan < new.len() {
                let (pos1, len) = self.index.prefix_search(old, new, self.scan + 1);
                self.pos = pos1.saturating_sub(1);
                self.len = len;

                while scsc < self.scan + self.len {
                    let shifted = scsc as isize + self.lastoffset;
                    if shifted >= 0 && (shifted as usize) < old.len() && old[shifted as usize] == new[scsc] {
                        oldscore += 1;
                    }
                    scsc += 1;
                }

                if (self.len == oldscore && self.len != 0) || self.len > oldscore + DISMATCH_THRESHOLD {
                    break;
                }

                let shifted = self.scan as isize + self.lastoffset;
                if shifted >= 0 && (shifted as usize) < old.len() && old[shifted as usize] == new[self.scan] {
                    oldscore = oldscore.saturating_sub(1);
                }
                self.scan += 1;
            }

            if self.len != oldscore || self.scan == new.len() {
                self.commit(container)?;
            }
        }
        Ok(())
    }

    /// Forward-extends from the previous commit point, backward-extends
    /// from the current match, resolves their overlap, emits the control
    /// record plus diff/data payloads, and advances the commit point.
    fn commit<W: Write>(&mut self, container: &mut ContainerWriter<W>) -> Result<()> {
        let old = self.old;
        let new = self.new;

        // Forward extension: maximize 2*s - i.
        let mut lenf = 0usize;
        {
            let mut s = 0isize;
            let mut best = 0isize;
            let mut i = 0usize;
            while self.lastscan + i < self.scan && self.lastpos + i < old.len() {
                if old[self.lastpos + i] == new[self.lastscan + i] {
                    s += 1;
                }
                i += 1;
                let score = 2 * s - i as isize;
                if score > best {
                    best = score;
                    lenf = i;
                }
            }
        }

        // Backward extension: maximize 2*s - i.
        let mut lenb = 0usize;
        if self.scan < new.len() {
            let mut s = 0isize;
            let mut best = 0isize;
            let mut i = 1usize;
            while self.scan >= self.lastscan + i && self.pos >= i {
                if old[self.pos - i] == new[self.scan - i] {
                    s += 1;
                }
                let score = 2 * s - i as isize;
                if score > best {
                    best = score;
                    lenb = i;
                }
                i += 1;
            }
        }

        // Overlap resolution: forward and backward extensions claim the same
        // bytes, so split them at the crossover that maximizes agreement.
        if self.lastscan + lenf > self.scan - lenb {
            let overlap = (self.lastscan + lenf) - (self.scan - lenb);
            let mut s = 0isize;
            let mut best = 0isize;
            let mut lens = 0usize;
            for i in 0..overlap {
                let fwd_match = new[self.lastscan + lenf - overlap + i] == old[self.lastpos + lenf - overlap + i];
                let bwd_match = new[self.scan - lenb + i] == old[self.pos - lenb + i];
                if fwd_match {
                    s += 1;
                }
                if bwd_match {
                    s -= 1;
                }
                if s > best {
                    best = s;
                    lens = i + 1;
                }
            }
            lenf = lenf + lens - overlap;
            lenb -= lens;
        }

        let diff_size = lenf;
        let copy_size = (self.scan - lenb) - (self.lastscan + lenf);
        let skip_size = (self.pos as isize - lenb as isize) - (self.lastpos as isize + lenf as isize);

        if diff_size != 0 || copy_size != 0 {
            container.emit_control(diff_size as i64, copy_size as i64, skip_size as i64)?;
            self.commits += 1;

            if diff_size > 0 {
                let mut buf = vec![0u8; self.bsize.min(diff_size)];
                let mut written = 0;
                while written < diff_size {
                    let k = buf.len().min(diff_size - written);
                    for j in 0..k {
                        buf[j] = new[self.lastscan + written + j].wrapping_sub(old[self.lastpos + written + j]);
                    }
                    container.emit_diff(&buf[..k])?;
                    written += k;
                }
            }

            if copy_size > 0 {
                let start = self.lastscan + diff_size;
                container.emit_data(&new[start..start + copy_size])?;
            }
        }

        self.lastscan = self.scan - lenb;
        self.lastpos = self.pos - lenb;
        self.lastoffset = self.pos as isize - self.scan as isize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bspatch::Bspatch;

    fn roundtrip(old: &[u8], new: &[u8], format: Format) {
        let mut patch = Vec::new();
        Bsdiff::new(old).compare(new, &mut patch, format).unwrap();

        let mut out = Vec::new();
        let written = Bspatch::new(&patch).unwrap().apply(old, &mut out).unwrap();
        assert_eq!(out, new);
        assert_eq!(written, new.len() as u64);
    }

    #[test]
    fn identity_classic() {
        roundtrip(b"hello world", b"hello world", Format::Classic);
    }

    #[test]
    fn single_byte_substitution() {
        roundtrip(b"abcdef", b"abcXef", Format::Classic);
    }

    #[test]
    fn insertion() {
        roundtrip(b"abcdef", b"abcZZZdef", Format::Classic);
    }

    #[test]
    fn empty_new() {
        roundtrip(b"some old data here", b"", Format::Classic);
    }

    #[test]
    fn empty_old() {
        roundtrip(b"", b"brand new data", Format::Classic);
    }

    #[test]
    fn endsley_roundtrip() {
        roundtrip(b"abcdef", b"abcZZZdef", Format::Endsley);
    }

    #[test]
    fn endsley_zero_size_new() {
        roundtrip(b"anything at all", b"", Format::Endsley);
    }

    #[test]
    fn large_block_move() {
        let a: Vec<u8> = (0..4096u32).map(|i| (i * 2654435761) as u8).collect();
        let b: Vec<u8> = (0..4096u32).map(|i| (i * 40503) as u8).collect();
        let old = [a.clone(), b.clone()].concat();
        let new = [b, a].concat();

        let mut patch = Vec::new();
        Bsdiff::new(&old).compare(&new, &mut patch, Format::Classic).unwrap();
        assert!(patch.len() < 2 * 4096, "patch should exploit the block move, got {} bytes", patch.len());

        roundtrip(&old, &new, Format::Classic);
    }
}
