use std::borrow::Cow;
use std::io;

use thiserror::Error;

/// Error conditions raised by the diff generator, the patch applier, and
/// index persistence.
///
/// Every fatal condition named in the error handling design is a distinct
/// variant so callers can match on *why* an operation failed, while
/// [`From`]/[`Into`] conversions to [`std::io::Error`] keep every public
/// entry point usable as a plain `io::Result<T>`.
#[derive(Debug, Error)]
pub enum Error {
    /// A control-record bounds violation, truncated payload, bad magic, or
    /// header field mismatch while reading a patch.
    #[error("corrupt patch: {0}")]
    CorruptPatch(Cow<'static, str>),

    /// A wrong header, bad unit size, or short read while reading a
    /// persisted suffix-array index.
    #[error("corrupt index: {0}")]
    CorruptIndex(Cow<'static, str>),

    /// An unknown format tag or other caller-supplied argument that cannot
    /// be honored.
    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>),

    /// The underlying byte stream failed.
    #[error("io failure: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt_patch(msg: impl Into<Cow<'static, str>>) -> Self {
        Error::CorruptPatch(msg.into())
    }

    pub(crate) fn corrupt_index(msg: impl Into<Cow<'static, str>>) -> Self {
        Error::CorruptIndex(msg.into())
    }

    pub(crate) fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(e) => e,
            Error::CorruptPatch(_) | Error::CorruptIndex(_) => {
                io::Error::new(io::ErrorKind::InvalidData, e.to_string())
            }
            Error::InvalidArgument(_) => io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        }
    }
}
