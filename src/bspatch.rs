#![forbid(unsafe_code)]

//! The patch applier: consumes control records and payloads from a parsed
//! [`container`](crate::container), reconstructs `new` from `old` with
//! bounds checks, and forwards the result to an output sink.

use std::io::Write;

use crate::container::ContainerReader;
use crate::error::{Error, Result};

/// Default copy buffer size.
///
/// Also the write buffer to the target stream: a relatively large buffer
/// (128k) speeds up writing when the target stream is unbuffered (e.g. a
/// plain [`std::fs::File`]).
pub const BUFFER_SIZE: usize = 131072;

/// Memory-saving bsdiff 4.x / Endsley compatible patcher.
///
/// ```
/// use std::io;
/// use bsdelta::Bspatch;
///
/// fn apply(old: &[u8], patch: &[u8]) -> io::Result<Vec<u8>> {
///     let applier = Bspatch::new(patch)?;
///     let mut new = Vec::with_capacity(applier.hint_new_size() as usize);
///     applier.apply(old, &mut new)?;
///     Ok(new)
/// }
/// ```
pub struct Bspatch<'p> {
    patch: &'p [u8],
    buffer_size: usize,
}

impl<'p> Bspatch<'p> {
    /// Parses the patch header (auto-detecting [`Format`](crate::container::Format)
    /// from the magic bytes) and creates a new patcher configuration.
    pub fn new(patch: &'p [u8]) -> Result<Self> {
        // Validate the header eagerly so construction fails the same way
        // `apply` would, without requiring a sink up front.
        ContainerReader::open(patch)?;
        Ok(Bspatch {
            patch,
            buffer_size: BUFFER_SIZE,
        })
    }

    /// Sets the main copy buffer size (`bs > 128`, default is [`BUFFER_SIZE`]).
    pub fn buffer_size(mut self, mut bs: usize) -> Self {
        if bs < 128 {
            bs = 128;
        }
        self.buffer_size = bs;
        self
    }

    /// Hints the declared size of `new`, as carried in the patch header.
    pub fn hint_new_size(&self) -> u64 {
        // `new()` already validated the header, so this cannot fail.
        ContainerReader::open(self.patch).expect("header validated in new()").new_size
    }

    /// Applies the patch to `old`, writing the reconstructed `new` to
    /// `target`. Returns the number of bytes written, which always equals
    /// the patch's declared new-file size.
    pub fn apply<T: Write>(self, old: &[u8], target: T) -> Result<u64> {
        let opened = ContainerReader::open(self.patch)?;
        let mut ctx = Context::new(opened.reader, old, target, opened.new_size, self.buffer_size);
        ctx.run()
    }
}

struct Context<'s, T: Write> {
    reader: ContainerReader<'s>,
    old: &'s [u8],
    target: T,
    declared_new_size: u64,
    buf: Vec<u8>,

    old_pos: i64,
    new_pos: u64,
}

impl<'s, T: Write> Context<'s, T> {
    fn new(reader: ContainerReader<'s>, old: &'s [u8], target: T, declared_new_size: u64, bsize: usize) -> Self {
        Context {
            reader,
            old,
            target,
            declared_new_size,
            buf: vec![0u8; bsize],
            old_pos: 0,
            new_pos: 0,
        }
    }

    fn run(&mut self) -> Result<u64> {
        while let Some((diff_size, copy_size, skip_size)) = self.reader.read_control()? {
            self.apply_one(diff_size, copy_size, skip_size)?;
        }
        self.target.flush().map_err(Error::Io)?;

        if self.new_pos != self.declared_new_size {
            return Err(Error::corrupt_patch(format!(
                "patch wrote {} bytes, declared new size is {}",
                self.new_pos, self.declared_new_size
            )));
        }
        Ok(self.new_pos)
    }

    fn apply_one(&mut self, diff_size: i64, copy_size: i64, skip_size: i64) -> Result<()> {
        if diff_size < 0 || copy_size < 0 {
            return Err(Error::corrupt_patch("negative diff_size or copy_size in control record"));
        }
        let (diff_size, copy_size) = (diff_size as u64, copy_size as u64);

        let new_end = self
            .new_pos
            .checked_add(diff_size)
            .and_then(|n| n.checked_add(copy_size))
            .ok_or_else(|| Error::corrupt_patch("control record overflows new-file size"))?;
        if new_end > self.declared_new_size {
            return Err(Error::corrupt_patch("control record would write past declared new size"));
        }

        if self.old_pos < 0 {
            return Err(Error::corrupt_patch("old cursor rewound before the start of old"));
        }
        let old_pos = self.old_pos as u64;
        let old_end = old_pos
            .checked_add(diff_size)
            .ok_or_else(|| Error::corrupt_patch("control record overflows old-file size"))?;
        if old_end > self.old.len() as u64 {
            return Err(Error::corrupt_patch("diff_size reaches past the end of old"));
        }

        self.write_diff(old_pos as usize, diff_size as usize)?;
        self.write_copy(copy_size as usize)?;

        self.new_pos = new_end;
        self.old_pos = self
            .old_pos
            .checked_add(diff_size as i64)
            .and_then(|p| p.checked_add(skip_size))
            .ok_or_else(|| Error::corrupt_patch("old cursor overflowed"))?;
        if self.old_pos < 0 {
            return Err(Error::corrupt_patch("old cursor rewound before the start of old"));
        }
        Ok(())
    }

    fn write_diff(&mut self, old_start: usize, mut count: usize) -> Result<()> {
        let mut old_off = old_start;
        while count > 0 {
            let k = self.buf.len().min(count);
            self.reader.read_diff(&mut self.buf[..k])?;
            for (b, &o) in self.buf[..k].iter_mut().zip(&self.old[old_off..old_off + k]) {
                *b = b.wrapping_add(o);
            }
            self.target.write_all(&self.buf[..k]).map_err(Error::Io)?;
            old_off += k;
            count -= k;
        }
        Ok(())
    }

    fn write_copy(&mut self, mut count: usize) -> Result<()> {
        while count > 0 {
            let k = self.buf.len().min(count);
            self.reader.read_data(&mut self.buf[..k])?;
            self.target.write_all(&self.buf[..k]).map_err(Error::Io)?;
            count -= k;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdiff::Bsdiff;
    use crate::container::Format;

    #[test]
    fn corrupt_classic_header_is_rejected() {
        let mut patch = Vec::new();
        Bsdiff::new(b"abcdef").compare(b"abcXef", &mut patch, Format::Classic).unwrap();

        // Flip the high byte of the control-block size field so it goes
        // negative under the sign-magnitude codec.
        patch[15] ^= 0x80;

        let err = Bspatch::new(&patch)
            .and_then(|p| p.apply(b"abcdef", &mut Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::CorruptPatch(_)));
    }

    #[test]
    fn truncated_patch_is_rejected() {
        let mut patch = Vec::new();
        Bsdiff::new(b"abcdef").compare(b"abcZZZdef", &mut patch, Format::Classic).unwrap();
        patch.truncate(patch.len() - 4);

        let err = Bspatch::new(&patch)
            .and_then(|p| p.apply(b"abcdef", &mut Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::CorruptPatch(_)));
    }

    #[test]
    fn endsley_zero_size_writes_nothing() {
        let mut patch = Vec::new();
        Bsdiff::new(b"anything").compare(b"", &mut patch, Format::Endsley).unwrap();

        let mut out = Vec::new();
        let n = Bspatch::new(&patch).unwrap().apply(b"anything", &mut out).unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }
}
