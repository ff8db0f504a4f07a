//! Shared fixtures for the `bsdelta` crate's integration tests and
//! benchmarks: reproducible random and distorted sample pairs, cached to
//! disk so repeated runs reuse the same inputs instead of regenerating
//! megabytes of random data every time.

use bsdelta::{Bsdiff, Bspatch, Format};
use rand::distributions::uniform::{SampleUniform, Uniform};
use rand::prelude::*;
use std::fs;
use std::io;
use std::path;

/// Fixture context rooted at a cache directory (typically
/// `$CARGO_MANIFEST_DIR/assets`).
pub struct Testing {
    cache_dir: path::PathBuf,
}

impl Testing {
    /// Creates a new fixture context; `cache_dir` need not exist yet.
    pub fn new(cache_dir: path::PathBuf) -> Self {
        Testing { cache_dir }
    }

    /// Diffs `old` against `new` using the crate under test.
    pub fn diff(&self, old: &[u8], new: &[u8], format: Format) -> io::Result<Vec<u8>> {
        let mut patch = Vec::new();
        Bsdiff::new(old)
            .compare(new, &mut patch, format)
            .map_err(io::Error::from)?;
        Ok(patch)
    }

    /// Applies `patch` to `old` using the crate under test.
    pub fn patch(&self, old: &[u8], patch: &[u8]) -> io::Result<Vec<u8>> {
        let applier = Bspatch::new(patch).map_err(io::Error::from)?;
        let mut new = Vec::with_capacity(applier.hint_new_size() as usize);
        applier.apply(old, &mut new).map_err(io::Error::from)?;
        Ok(new)
    }

    /// Prepares (or loads from cache) the default random/distorted sample
    /// pairs described by `descs`.
    pub fn get_random_samples(&self, descs: &[RandomSample]) -> io::Result<Vec<Sample>> {
        get_random_caches_in(self.cache_dir.join("random-samples"), descs)
    }
}

/// A cached source/target pair.
pub struct Sample {
    pub name: String,
    source: path::PathBuf,
    target: path::PathBuf,
}

impl Sample {
    pub fn load_source(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.source)
    }

    pub fn load_target(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.target)
    }
}

fn get_random_caches_in<P: AsRef<path::Path>>(dir: P, descs: &[RandomSample]) -> io::Result<Vec<Sample>> {
    fs::create_dir_all(dir.as_ref())?;

    let mut samples = Vec::new();
    for desc in descs.iter() {
        let source = dir.as_ref().join(format!("{}.s", desc.name));
        let source_bytes;
        if !exists_file(source.as_path()) {
            source_bytes = match desc.source {
                RandomSource::Bytes(bytes) => Vec::from(bytes),
                RandomSource::Random(size) => random_bytes(size),
            };
            fs::write(source.as_path(), &source_bytes[..])?;
        } else {
            source_bytes = fs::read(source.as_path())?;
        }

        for (i, tdesc) in desc.targets.iter().enumerate() {
            let target = dir.as_ref().join(format!("{}.t{}", desc.name, i));
            if !exists_file(target.as_path()) {
                match tdesc {
                    RandomTarget::Bytes(bytes) => fs::write(target.as_path(), bytes)?,
                    RandomTarget::Distort(similar) => {
                        let target_bytes = distort(&source_bytes[..], *similar);
                        fs::write(target.as_path(), target_bytes)?;
                    }
                }
            }
            samples.push(Sample {
                name: format!("{}/{}", desc.name, i),
                source: source.clone(),
                target,
            });
        }
    }

    Ok(samples)
}

/// Description of one random sample family: a source plus several targets
/// derived from it.
pub struct RandomSample {
    pub name: &'static str,
    pub source: RandomSource,
    pub targets: Vec<RandomTarget>,
}

/// Description of the source of a random sample.
pub enum RandomSource {
    Bytes(&'static [u8]),
    Random(usize),
}

/// Description of one target derived from a random sample's source.
pub enum RandomTarget {
    Bytes(&'static [u8]),
    /// A target of roughly the source's size, with `similar` in `[0, 1]`
    /// controlling how much of it resembles shifted/verbatim source data
    /// versus fresh random bytes.
    Distort(f64),
}

/// The default random/distorted sample descriptions used by the
/// invertibility and compatibility test suites.
pub fn default_random_samples() -> Vec<RandomSample> {
    use RandomSource::{Bytes as SBytes, Random};
    use RandomTarget::{Bytes as TBytes, Distort};

    vec![
        RandomSample {
            name: "empty",
            source: SBytes(b""),
            targets: vec![TBytes(b""), TBytes(b"extra")],
        },
        RandomSample {
            name: "small",
            source: SBytes(
                b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempo\
r incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis no\
strud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Dui\
s aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fu\
giat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in cu\
lpa qui officia deserunt mollit anim id est laborum.",
            ),
            targets: vec![
                TBytes(b""),
                TBytes(
                    b"consectetur adip##cing elit, jed do eiusmod wir mussen wissen. wir werden wis\
sen/ laboris nisi ut al&^%ip ex ea coikodo consequat. ",
                ),
                TBytes(b"the quick brown fox jumps over the lazy dog"),
                Distort(0.0),
                Distort(0.5),
                Distort(1.0),
            ],
        },
        RandomSample {
            name: "rand-4k",
            source: Random(4096),
            targets: vec![TBytes(b""), Distort(0.0), Distort(0.5), Distort(1.0)],
        },
        RandomSample {
            name: "rand-256k",
            source: Random(256 * 1024),
            targets: vec![TBytes(b""), Distort(0.0), Distort(0.5), Distort(1.0)],
        },
        RandomSample {
            name: "rand-1m",
            source: Random(1024 * 1024),
            targets: vec![TBytes(b""), Distort(0.0), Distort(0.5), Distort(1.0)],
        },
    ]
}

fn random_bytes(n: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    let mut bytes = Vec::with_capacity(n);
    for _ in 0..n {
        bytes.push(rng.gen());
    }
    bytes
}

/// Builds a target of roughly the source's size by stitching together
/// delta-like runs (copied from random offsets of the source, with some
/// bytes perturbed) and random "extra" runs, the way a real successive
/// build would differ from its predecessor.
fn distort(source: &[u8], similar: f64) -> Vec<u8> {
    if source.is_empty() {
        return random_bytes(256);
    }

    let similar = fraction(similar);
    let rate = convex_mapping(similar);

    let tsize = random_between(
        (source.len() as f64 * 0.75) as usize,
        (source.len() as f64 * 1.25) as usize,
    );
    let dmax = random_between(
        Ord::min(16, (source.len() as f64 * 0.02) as usize),
        Ord::max(32, (source.len() as f64 * 0.33) as usize),
    );
    let emax = random_between(0, (source.len() as f64 * 0.15 * (1.0 - similar)) as usize);

    let mut target = Vec::with_capacity(tsize);
    let mut rng = thread_rng();
    while target.len() < tsize {
        // Delta-like run: mostly copied from the source, occasionally perturbed.
        let remain = tsize - target.len();
        let dsize = {
            let dhi = Ord::min(Ord::min(dmax, remain), source.len());
            let dlo = Ord::min(16, dhi);
            random_between(dlo, dhi)
        };
        let offset = random_between(0, source.len() - dsize);
        for &x in source[offset..offset + dsize].iter() {
            if random_decide(rate) {
                target.push(x);
            } else {
                target.push(rng.gen());
            }
        }

        // Extra run: fresh random bytes with no source counterpart.
        let remain = tsize - target.len();
        if !random_decide(rate) {
            let esize = random_between(0, Ord::min(emax, remain));
            for _ in 0..esize {
                target.push(rng.gen());
            }
        }
    }

    target
}

fn random_decide(rate: f64) -> bool {
    random_between(0.0, 1.0) <= fraction(rate)
}

fn random_between<X: SampleUniform>(lo: X, hi: X) -> X {
    let mut rng = thread_rng();
    Uniform::new_inclusive(lo, hi).sample(&mut rng)
}

fn fraction(x: f64) -> f64 {
    if x.is_nan() || x.is_sign_negative() {
        0.0
    } else if x.is_infinite() || x > 1.0 {
        1.0
    } else {
        x
    }
}

fn convex_mapping(frac: f64) -> f64 {
    (1.0 - (1.0 - frac) * (1.0 - frac)).sqrt()
}

fn exists_file<P: AsRef<path::Path>>(name: P) -> bool {
    fs::metadata(name).map(|meta| meta.is_file()).unwrap_or(false)
}
