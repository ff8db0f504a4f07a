//! Path-based entry points: `diff`, `patch`, and `index` operate on files
//! rather than in-memory buffers, creating a fresh temporary file when an
//! output path is omitted.
//!
//! Every output this module opens for writing is deleted before an error
//! propagates (see [`OutputGuard`]), per the delete-on-error contract that
//! applies to all three entry points.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::bsdiff::Bsdiff;
use crate::bspatch::Bspatch;
use crate::container::{detect_format, Format};
use crate::error::{Error, Result};
use crate::suffix::SuffixIndex;

/// Where [`diff`] should source its suffix array from.
pub enum OldSource {
    /// Build a fresh suffix array over the file at this path.
    Path(PathBuf),
    /// Reuse a suffix array previously persisted by [`index`] for the file
    /// at the first path.
    WithIndex(PathBuf, PathBuf),
}

impl From<PathBuf> for OldSource {
    fn from(old_path: PathBuf) -> Self {
        OldSource::Path(old_path)
    }
}

impl From<(PathBuf, PathBuf)> for OldSource {
    fn from((old_path, index_path): (PathBuf, PathBuf)) -> Self {
        OldSource::WithIndex(old_path, index_path)
    }
}

impl OldSource {
    fn old_path(&self) -> &Path {
        match self {
            OldSource::Path(p) | OldSource::WithIndex(p, _) => p,
        }
    }
}

/// Diffs `old` against the file at `new_path`, writing a patch of the given
/// `format` to `patch_path` (or a fresh temporary file if omitted). Returns
/// the path the patch was written to.
pub fn diff(old: impl Into<OldSource>, new_path: impl AsRef<Path>, patch_path: Option<PathBuf>, format: Format) -> Result<PathBuf> {
    let old_source = old.into();
    let old_bytes = fs::read(old_source.old_path())?;
    let new_bytes = fs::read(new_path.as_ref())?;

    let mut guard = OutputGuard::create(patch_path, "bsdelta-patch-")?;
    let outcome = (|| -> Result<()> {
        let bsdiff = match &old_source {
            OldSource::Path(_) => Bsdiff::new(&old_bytes),
            OldSource::WithIndex(_, index_path) => {
                let index_bytes = fs::read(index_path)?;
                let index = SuffixIndex::read(&index_bytes[..], old_bytes.len())?;
                Bsdiff::with_index(&old_bytes, index)
            }
        };
        bsdiff.compare(&new_bytes, guard.file(), format)?;
        Ok(())
    })();

    outcome.map(|()| guard.keep())
}

/// Applies `patch_path` to `old_path`, writing the reconstructed file to
/// `new_path` (or a fresh temporary file if omitted). `format` is checked
/// against the patch's own magic bytes; a mismatch is an invalid-argument
/// error rather than silently trusting the caller's label.
pub fn patch(old_path: impl AsRef<Path>, new_path: Option<PathBuf>, patch_path: impl AsRef<Path>, format: Format) -> Result<PathBuf> {
    let old_bytes = fs::read(old_path.as_ref())?;
    let patch_bytes = fs::read(patch_path.as_ref())?;

    let actual = detect_format(&patch_bytes)?;
    if actual != format {
        return Err(Error::invalid_argument(format!(
            "patch file is {actual:?} but {format:?} was requested"
        )));
    }

    let applier = Bspatch::new(&patch_bytes)?;
    let mut guard = OutputGuard::create(new_path, "bsdelta-new-")?;
    let outcome = applier.apply(&old_bytes, guard.file()).map(|_| ());
    outcome.map(|()| guard.keep())
}

/// Builds a suffix array over `old_path` and persists it to `index_path`
/// (or a fresh temporary file if omitted). Returns the path the index was
/// written to.
pub fn index(old_path: impl AsRef<Path>, index_path: Option<PathBuf>) -> Result<PathBuf> {
    let old_bytes = fs::read(old_path.as_ref())?;
    let idx = SuffixIndex::build(&old_bytes);

    let mut guard = OutputGuard::create(index_path, "bsdelta-index-")?;
    let outcome = idx.write(guard.file());
    outcome.map(|()| guard.keep())
}

/// Opens `path` for writing if given, else allocates a fresh named
/// temporary file. Either way, deletes the underlying file on drop unless
/// [`OutputGuard::keep`] disarms it — the single place the delete-on-error
/// contract (spec.md §5, §7) is implemented, shared by all three path-based
/// entry points.
struct OutputGuard {
    path: PathBuf,
    file: Option<File>,
    armed: bool,
}

impl OutputGuard {
    fn create(path: Option<PathBuf>, prefix: &str) -> Result<Self> {
        match path {
            Some(path) => {
                let file = File::create(&path).map_err(Error::Io)?;
                Ok(OutputGuard { path, file: Some(file), armed: true })
            }
            None => {
                let tmp = tempfile::Builder::new().prefix(prefix).tempfile().map_err(Error::Io)?;
                let (file, path) = tmp.keep().map_err(|e| Error::Io(e.error))?;
                Ok(OutputGuard { path, file: Some(file), armed: true })
            }
        }
    }

    fn file(&mut self) -> &mut File {
        self.file.as_mut().expect("file stays open for the guard's lifetime")
    }

    /// Disarms deletion and returns the surviving path.
    fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        self.file.take();
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
