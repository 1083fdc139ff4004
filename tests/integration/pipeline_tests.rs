//! End-to-end scans through the full pipeline.

use dupefind::duplicates::{CandidateGroup, DuplicateFinder, FinderConfig};
use dupefind::scanner::WalkerConfig;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Groups as sets, so neither group order nor member order matters.
fn as_sets(groups: Vec<CandidateGroup>) -> BTreeSet<BTreeSet<PathBuf>> {
    groups.into_iter().map(|g| g.into_iter().collect()).collect()
}

fn set(paths: &[&PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().map(|p| (*p).clone()).collect()
}

fn scan(root: &Path, config: FinderConfig) -> BTreeSet<BTreeSet<PathBuf>> {
    let (groups, _) = DuplicateFinder::new(config).collect_duplicates(root).unwrap();
    as_sets(groups)
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_hello_world_scenario() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.txt", b"hello");
    let b = write(dir.path(), "b.txt", b"hello");
    write(dir.path(), "c.txt", b"world");

    let groups = scan(dir.path(), FinderConfig::default());

    assert_eq!(groups, BTreeSet::from([set(&[&a, &b])]));
}

#[test]
fn test_multi_chunk_zero_files() {
    let dir = TempDir::new().unwrap();
    let x = write(dir.path(), "x.bin", &[0u8; 10_000]);
    let y = write(dir.path(), "y.bin", &[0u8; 10_000]);

    let groups = scan(dir.path(), FinderConfig::default().with_chunk_size(1024));

    assert_eq!(groups, BTreeSet::from([set(&[&x, &y])]));
}

#[test]
fn test_length_sensitivity() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "short", b"abc");
    write(dir.path(), "long", b"abcabc");

    assert!(scan(dir.path(), FinderConfig::default().with_chunk_size(3)).is_empty());
}

#[test]
fn test_same_size_different_content() {
    let dir = TempDir::new().unwrap();
    for (i, byte) in [b'a', b'b', b'c', b'd'].iter().enumerate() {
        write(dir.path(), &format!("f{i}"), &[*byte; 4096]);
    }

    assert!(scan(dir.path(), FinderConfig::default().with_chunk_size(100)).is_empty());
}

#[test]
fn test_nested_directories_small_pages() {
    let dir = TempDir::new().unwrap();
    let mut expected = BTreeSet::new();
    for i in 0..40 {
        expected.insert(write(dir.path(), &format!("d{}/e{}/copy{i}", i % 5, i % 3), b"payload"));
    }
    write(dir.path(), "d0/unique", b"PAYLOAD");

    let config = FinderConfig::default().with_walker_config(WalkerConfig::default().with_page_size(2));
    let groups = scan(dir.path(), config);

    assert_eq!(groups, BTreeSet::from([expected]));
}

#[test]
fn test_empty_files_form_a_group() {
    let dir = TempDir::new().unwrap();
    let e1 = write(dir.path(), "empty1", b"");
    let e2 = write(dir.path(), "sub/empty2", b"");
    write(dir.path(), "full", b"x");

    let groups = scan(dir.path(), FinderConfig::default());

    assert_eq!(groups, BTreeSet::from([set(&[&e1, &e2])]));
}

#[test]
fn test_scan_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/1", b"one");
    write(dir.path(), "b/1", b"one");
    write(dir.path(), "a/2", b"two two");
    write(dir.path(), "b/2", b"two two");
    write(dir.path(), "c/2", b"two two");

    let first = scan(dir.path(), FinderConfig::default());
    let second = scan(dir.path(), FinderConfig::default());

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn test_rescan_sees_new_files() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a", b"data");
    let finder = DuplicateFinder::with_defaults();

    let (before, _) = finder.collect_duplicates(dir.path()).unwrap();
    assert!(before.is_empty());

    let b = write(dir.path(), "b", b"data");
    let (after, _) = finder.collect_duplicates(dir.path()).unwrap();
    assert_eq!(as_sets(after), BTreeSet::from([set(&[&a, &b])]));
}

#[test]
fn test_single_worker_pipeline() {
    let dir = TempDir::new().unwrap();
    let mut expected = BTreeSet::new();
    for i in 0..10u8 {
        let first = write(dir.path(), &format!("g{i}_a"), &[i; 300]);
        let second = write(dir.path(), &format!("g{i}_b"), &[i; 300]);
        expected.insert(set(&[&first, &second]));
    }

    let config = FinderConfig::default()
        .with_hash_workers(1)
        .with_verify_workers(1)
        .with_chunk_size(64);
    assert_eq!(scan(dir.path(), config), expected);
}

#[test]
fn test_summary_counts() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a", b"12345");
    write(dir.path(), "b", b"12345");
    write(dir.path(), "c", b"12345");
    write(dir.path(), "d", b"54321");
    write(dir.path(), "e", b"xy");

    let (_, summary) = DuplicateFinder::with_defaults().collect_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 5);
    assert_eq!(summary.total_bytes, 22);
    assert_eq!(summary.size_candidates, 4);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 2);
    assert_eq!(summary.reclaimable_space, 10);
    assert!(!summary.interrupted);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_reported() {
    let dir = TempDir::new().unwrap();
    let real = write(dir.path(), "real", b"content");
    std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

    assert!(scan(dir.path(), FinderConfig::default()).is_empty());
}
