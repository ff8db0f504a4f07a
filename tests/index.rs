//! Index persistence and reuse, exercised through the public path-based API.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use bsdelta::{diff, index, patch, Format};

fn write_temp(bytes: &[u8]) -> PathBuf {
    let mut tmp = tempfile::Builder::new().prefix("bsdelta-index-test-").tempfile().unwrap();
    tmp.write_all(bytes).unwrap();
    let (_, path) = tmp.keep().unwrap();
    path
}

#[test]
fn persisted_index_produces_the_same_patch_as_a_fresh_one() {
    let old_path = write_temp(b"mississippi river delta, mississippi river delta, mississippi");
    let new_path = write_temp(b"mississippi river basin, mississippi river delta, missouri");

    let index_path = index(&old_path, None).unwrap();

    let direct = diff(old_path.clone(), &new_path, None, Format::Classic).unwrap();
    let via_index = diff((old_path.clone(), index_path.clone()), &new_path, None, Format::Classic).unwrap();

    assert_eq!(fs::read(&direct).unwrap(), fs::read(&via_index).unwrap());

    for p in [&old_path, &new_path, &index_path, &direct, &via_index] {
        fs::remove_file(p).ok();
    }
}

#[test]
fn patch_built_from_a_persisted_index_still_applies() {
    let old_path = write_temp(b"the quick brown fox jumps over the lazy dog");
    let new_path = write_temp(b"the quick red fox jumps over the lazy dogs");

    let index_path = index(&old_path, None).unwrap();
    let patch_path = diff((old_path.clone(), index_path.clone()), &new_path, None, Format::Classic).unwrap();
    let out_path = patch(&old_path, None, &patch_path, Format::Classic).unwrap();

    assert_eq!(fs::read(&out_path).unwrap(), fs::read(&new_path).unwrap());

    for p in [&old_path, &new_path, &index_path, &patch_path, &out_path] {
        fs::remove_file(p).ok();
    }
}

#[test]
fn index_over_empty_file_round_trips() {
    let old_path = write_temp(b"");
    let index_path = index(&old_path, None).unwrap();
    assert!(fs::metadata(&index_path).unwrap().len() > 0, "header-only index is still non-empty");

    fs::remove_file(old_path).ok();
    fs::remove_file(index_path).ok();
}
