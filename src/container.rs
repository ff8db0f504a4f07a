//! The two wire-compatible patch container variants.
//!
//! Both frame the same three logical substreams (control records, diff
//! payload, data payload); they differ in how those substreams are laid
//! out and compressed. Modeled as a tagged [`Format`] rather than a trait
//! object, dispatched explicitly, per the design note on avoiding runtime
//! subtype polymorphism for a two-member closed set.

use std::io::{Cursor, Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
pub use bzip2::Compression;

use crate::codec::{decode_int, encode_int};
use crate::error::{Error, Result};

const CLASSIC_MAGIC: &[u8; 8] = b"BSDIFF40";
const ENDSLEY_MAGIC: &[u8; 16] = b"ENDSLEY/BSDIFF43";

/// Which container variant to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `BSDIFF40`: header with three size fields, three independently
    /// bzip2-framed substreams.
    #[default]
    Classic,
    /// `ENDSLEY/BSDIFF43`: header with a `new_size` field, one interleaved
    /// bzip2 stream holding repeated `(control, diff bytes, data bytes)`.
    Endsley,
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Format> {
        match s {
            "classic" => Ok(Format::Classic),
            "endsley" => Ok(Format::Endsley),
            other => Err(Error::invalid_argument(format!(
                "unknown patch format `{other}`, expected `classic` or `endsley`"
            ))),
        }
    }
}

/// Thin `Write` wrapper that counts bytes passed through, so
/// [`ContainerWriter::close`] can report the final patch size without the
/// caller having to track it separately.
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Container writer: accumulates control/diff/data substreams and, on
/// [`ContainerWriter::close`], emits the framed, compressed patch.
pub(crate) enum ContainerWriter<W: Write> {
    Classic {
        sink: CountingWriter<W>,
        ctrls: BzEncoder<Cursor<Vec<u8>>>,
        delta: BzEncoder<Cursor<Vec<u8>>>,
        extra: BzEncoder<Cursor<Vec<u8>>>,
        new_size: u64,
    },
    Endsley {
        body: BzEncoder<CountingWriter<W>>,
    },
}

impl<W: Write> ContainerWriter<W> {
    /// Opens a container for writing: emits whatever header can be emitted
    /// up front and sets up the compressors.
    ///
    /// The classic variant's header cannot be written yet (its size fields
    /// depend on the compressed substream lengths), so it is buffered in
    /// memory and only flushed to `sink` on [`close`](Self::close) — the
    /// same two-pass shape the teacher's `bsdiff::Context::compare` uses.
    pub fn open(sink: W, format: Format, new_size: u64, level: Compression) -> Result<Self> {
        let mut sink = CountingWriter { inner: sink, count: 0 };
        match format {
            Format::Classic => Ok(ContainerWriter::Classic {
                sink,
                ctrls: BzEncoder::new(Cursor::new(Vec::new()), level),
                delta: BzEncoder::new(Cursor::new(Vec::new()), level),
                extra: BzEncoder::new(Cursor::new(Vec::new()), level),
                new_size,
            }),
            Format::Endsley => {
                let mut header = [0u8; 24];
                header[0..16].copy_from_slice(ENDSLEY_MAGIC);
                header[16..24].copy_from_slice(&new_size.to_le_bytes());
                sink.write_all(&header)?;
                Ok(ContainerWriter::Endsley {
                    body: BzEncoder::new(sink, level),
                })
            }
        }
    }

    pub fn emit_control(&mut self, add: i64, copy: i64, seek: i64) -> Result<()> {
        let mut buf = [0u8; 24];
        encode_int(add, &mut buf[0..8]);
        encode_int(copy, &mut buf[8..16]);
        encode_int(seek, &mut buf[16..24]);
        match self {
            ContainerWriter::Classic { ctrls, .. } => ctrls.write_all(&buf)?,
            ContainerWriter::Endsley { body } => body.write_all(&buf)?,
        }
        Ok(())
    }

    pub fn emit_diff(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            ContainerWriter::Classic { delta, .. } => delta.write_all(bytes)?,
            ContainerWriter::Endsley { body } => body.write_all(bytes)?,
        }
        Ok(())
    }

    pub fn emit_data(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            ContainerWriter::Classic { extra, .. } => extra.write_all(bytes)?,
            ContainerWriter::Endsley { body } => body.write_all(bytes)?,
        }
        Ok(())
    }

    /// Flushes every compressor and writes the final framing. Returns the
    /// total number of bytes written to the underlying sink.
    pub fn close(self) -> Result<u64> {
        match self {
            ContainerWriter::Classic {
                mut sink,
                ctrls,
                delta,
                extra,
                new_size,
            } => {
                let bz_ctrls = ctrls.finish()?.into_inner();
                let bz_delta = delta.finish()?.into_inner();
                let bz_extra = extra.finish()?.into_inner();

                let mut header = [0u8; 32];
                header[0..8].copy_from_slice(CLASSIC_MAGIC);
                encode_int(bz_ctrls.len() as i64, &mut header[8..16]);
                encode_int(bz_delta.len() as i64, &mut header[16..24]);
                encode_int(new_size as i64, &mut header[24..32]);

                sink.write_all(&header)?;
                sink.write_all(&bz_ctrls)?;
                sink.write_all(&bz_delta)?;
                sink.write_all(&bz_extra)?;
                sink.flush()?;

                Ok(sink.count)
            }
            ContainerWriter::Endsley { body } => {
                let mut sink = body.finish()?;
                sink.flush()?;
                Ok(sink.count)
            }
        }
    }
}

/// Container reader: parses the header up front, exposes the declared
/// new-file size (if any), and yields control/diff/data reads in order.
pub(crate) enum ContainerReader<'p> {
    Classic {
        ctrls: BzDecoder<Cursor<&'p [u8]>>,
        delta: BzDecoder<Cursor<&'p [u8]>>,
        extra: BzDecoder<Cursor<&'p [u8]>>,
    },
    Endsley {
        body: BzDecoder<Cursor<&'p [u8]>>,
    },
}

pub(crate) struct OpenedPatch<'p> {
    pub reader: ContainerReader<'p>,
    pub new_size: u64,
}

/// Detects which container variant a patch's magic bytes identify, without
/// parsing the rest of the header.
pub(crate) fn detect_format(patch: &[u8]) -> Result<Format> {
    if patch.len() >= 8 && &patch[..8] == CLASSIC_MAGIC {
        Ok(Format::Classic)
    } else if patch.len() >= 16 && &patch[..16] == ENDSLEY_MAGIC {
        Ok(Format::Endsley)
    } else {
        Err(Error::corrupt_patch("not a valid patch: unrecognized magic"))
    }
}

impl<'p> ContainerReader<'p> {
    /// Detects the format from the magic bytes and parses the header.
    pub fn open(patch: &'p [u8]) -> Result<OpenedPatch<'p>> {
        match detect_format(patch)? {
            Format::Classic => Self::open_classic(patch),
            Format::Endsley => Self::open_endsley(patch),
        }
    }

    fn open_classic(patch: &'p [u8]) -> Result<OpenedPatch<'p>> {
        if patch.len() < 32 {
            return Err(Error::corrupt_patch("classic header truncated"));
        }
        let csize = decode_int(&patch[8..16]);
        let dsize = decode_int(&patch[16..24]);
        let tsize = decode_int(&patch[24..32]);
        if csize < 0 || dsize < 0 || tsize < 0 {
            return Err(Error::corrupt_patch("negative size field in header"));
        }
        let (csize, dsize, tsize) = (csize as u64, dsize as u64, tsize as u64);
        if 32u64
            .checked_add(csize)
            .and_then(|n| n.checked_add(dsize))
            .map(|n| n > patch.len() as u64)
            .unwrap_or(true)
        {
            return Err(Error::corrupt_patch("patch truncated before declared substreams"));
        }

        let (_, rest) = patch.split_at(32);
        let (bz_ctrls, rest) = rest.split_at(csize as usize);
        let (bz_delta, bz_extra) = rest.split_at(dsize as usize);

        Ok(OpenedPatch {
            reader: ContainerReader::Classic {
                ctrls: BzDecoder::new(Cursor::new(bz_ctrls)),
                delta: BzDecoder::new(Cursor::new(bz_delta)),
                extra: BzDecoder::new(Cursor::new(bz_extra)),
            },
            new_size: tsize,
        })
    }

    fn open_endsley(patch: &'p [u8]) -> Result<OpenedPatch<'p>> {
        if patch.len() < 24 {
            return Err(Error::corrupt_patch("endsley header truncated"));
        }
        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&patch[16..24]);
        let new_size = u64::from_le_bytes(size_bytes);
        let body = &patch[24..];

        Ok(OpenedPatch {
            reader: ContainerReader::Endsley {
                body: BzDecoder::new(Cursor::new(body)),
            },
            new_size,
        })
    }

    /// Reads one control record, or `None` at a clean end of stream.
    pub fn read_control(&mut self) -> Result<Option<(i64, i64, i64)>> {
        let mut buf = [0u8; 24];
        let n = match self {
            ContainerReader::Classic { ctrls, .. } => read_exact_or_eof(ctrls, &mut buf)?,
            ContainerReader::Endsley { body } => read_exact_or_eof(body, &mut buf)?,
        };
        if n == 0 {
            return Ok(None);
        }
        let add = decode_int(&buf[0..8]);
        let copy = decode_int(&buf[8..16]);
        let seek = decode_int(&buf[16..24]);
        Ok(Some((add, copy, seek)))
    }

    pub fn read_diff(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            ContainerReader::Classic { delta, .. } => read_exact_checked(delta, buf, "diff payload"),
            ContainerReader::Endsley { body } => read_exact_checked(body, buf, "diff payload"),
        }
    }

    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            ContainerReader::Classic { extra, .. } => read_exact_checked(extra, buf, "data payload"),
            ContainerReader::Endsley { body } => read_exact_checked(body, buf, "data payload"),
        }
    }
}

/// Reads exactly `buf.len()` bytes from a substream reader, surfacing a
/// truncated or corrupt bzip2 stream as `Error::CorruptPatch` instead of
/// the bare `io::Error` `Read::read_exact` would otherwise produce — the
/// same treatment `read_exact_or_eof` gives the control stream below.
fn read_exact_checked<R: Read>(r: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    r.read_exact(buf)
        .map_err(|e| Error::corrupt_patch(format!("truncated or corrupt {what}: {e}")))
}

/// Reads exactly `buf.len()` bytes, or a clean EOF before any byte is read.
/// Returns the number of bytes actually read (either `0` or `buf.len()`).
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match r.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if read != 0 && read != buf.len() {
        return Err(Error::corrupt_patch("truncated control record"));
    }
    Ok(read)
}
