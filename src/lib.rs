#![forbid(unsafe_code)]

/*!
Binary delta compressor and patcher compatible with bsdiff 4.x (`BSDIFF40`)
and the Endsley bsdiff43 (`ENDSLEY/BSDIFF43`) patch formats.

This is the classical bsdiff algorithm: a suffix array over `old` is
searched for approximate matches to prefixes of `new`, candidate matches
are scored against a cost model that tolerates mismatches, and the chosen
match is extended forward and backward with an overlap-resolution pass.
The result is a compact, greedy (not minimum-size) patch.

Add the dependency to `Cargo.toml`:
```toml
[dependencies]
bsdelta = "0.1"
```

Build commands
--------------

The `bsdiff`, `bspatch`, and `bsindex` binaries are built with the `cmd`
feature:
```shell
$ cargo build --release --bins --features cmd
$ target/release/bsdiff -h
```

Examples
--------

Diff `old` against `new`, then patch `old` back to `new`:
```rust
use std::io;
use bsdelta::{Bsdiff, Bspatch, Format};

fn roundtrip(old: &[u8], new: &[u8]) -> io::Result<Vec<u8>> {
    let mut patch = Vec::new();
    Bsdiff::new(old).compare(new, &mut patch, Format::Classic)?;

    let mut out = Vec::new();
    Bspatch::new(&patch)?.apply(old, &mut out)?;
    Ok(out)
}
```

The in-memory [`Bsdiff`]/[`Bspatch`] builders operate entirely on byte
slices; the [`diff`], [`patch`], and [`index`] free functions wrap them
with a path-based, temp-file-aware surface suited to CLI-style callers.

Note that this crate does not produce byte-identical patches to the
reference `bsdiff`/`bspatch` tools; only the patch file formats are
promised to be wire-compatible.
*/

pub mod api;
pub mod bsdiff;
pub mod bspatch;
pub mod codec;
pub mod container;
pub mod error;
pub mod suffix;

pub use api::{diff, index, patch, OldSource};
pub use bsdiff::{Bsdiff, Compression};
pub use bspatch::Bspatch;
pub use container::Format;
pub use error::{Error, Result};
pub use suffix::SuffixIndex;
