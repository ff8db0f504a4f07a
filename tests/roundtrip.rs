//! End-to-end diff/patch scenarios, driven entirely through the crate's
//! public in-memory API (`Bsdiff`/`Bspatch`) and both container formats.

use bsdelta::{Bsdiff, Bspatch, Error, Format};
use bsdelta_testutils::{default_random_samples, Testing};

fn assert_roundtrip(old: &[u8], new: &[u8], format: Format) {
    let mut patch = Vec::new();
    Bsdiff::new(old).compare(new, &mut patch, format).unwrap();

    let applier = Bspatch::new(&patch).unwrap();
    assert_eq!(applier.hint_new_size(), new.len() as u64);

    let mut out = Vec::new();
    let written = applier.apply(old, &mut out).unwrap();
    assert_eq!(out, new);
    assert_eq!(written, new.len() as u64);
}

#[test]
fn identity() {
    assert_roundtrip(b"the quick brown fox", b"the quick brown fox", Format::Classic);
    assert_roundtrip(b"the quick brown fox", b"the quick brown fox", Format::Endsley);
}

#[test]
fn single_byte_substitution() {
    assert_roundtrip(b"the quick brown fox", b"the quick brOwn fox", Format::Classic);
}

#[test]
fn insertion_and_deletion() {
    assert_roundtrip(b"the quick brown fox", b"the very quick fox", Format::Classic);
    assert_roundtrip(b"the quick brown fox", b"the very quick fox", Format::Endsley);
}

#[test]
fn large_block_move_produces_a_small_patch() {
    let a: Vec<u8> = (0..8192u32).map(|i| (i.wrapping_mul(2654435761)) as u8).collect();
    let b: Vec<u8> = (0..8192u32).map(|i| (i.wrapping_mul(40503)) as u8).collect();
    let old = [a.clone(), b.clone()].concat();
    let new = [b, a].concat();

    let mut patch = Vec::new();
    Bsdiff::new(&old).compare(&new, &mut patch, Format::Classic).unwrap();
    assert!(
        patch.len() < new.len() / 2,
        "expected the suffix-array match to exploit the swapped blocks, got {} bytes for {} bytes of input",
        patch.len(),
        new.len()
    );

    let mut out = Vec::new();
    Bspatch::new(&patch).unwrap().apply(&old, &mut out).unwrap();
    assert_eq!(out, new);
}

#[test]
fn empty_old_and_empty_new() {
    assert_roundtrip(b"", b"brand new content", Format::Classic);
    assert_roundtrip(b"some existing content", b"", Format::Classic);
    assert_roundtrip(b"", b"", Format::Endsley);
}

#[test]
fn corrupt_patch_is_rejected_before_any_output_is_trusted() {
    let mut patch = Vec::new();
    Bsdiff::new(b"hello world").compare(b"hello there world", &mut patch, Format::Classic).unwrap();
    patch.truncate(patch.len() / 2);

    let result = Bspatch::new(&patch).and_then(|p| p.apply(b"hello world", &mut Vec::new()));
    assert!(matches!(result, Err(Error::CorruptPatch(_))));
}

#[test]
fn random_and_distorted_samples_roundtrip_in_both_formats() {
    let testing = Testing::new(std::env::temp_dir().join("bsdelta-roundtrip-fixtures"));
    let samples = testing.get_random_samples(&default_random_samples()).unwrap();

    for sample in samples {
        let old = sample.load_source().unwrap();
        let new = sample.load_target().unwrap();
        assert_roundtrip(&old, &new, Format::Classic);
        assert_roundtrip(&old, &new, Format::Endsley);
    }
}
