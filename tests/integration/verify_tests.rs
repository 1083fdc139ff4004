//! Byte verification driven directly, as the hash stage would feed it.

use dupefind::duplicates::{hash_group, verify_group};
use dupefind::signal::CancelToken;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write_all(dir: &TempDir, files: &[(&str, &[u8])]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, content)| {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}

fn as_sets(groups: Vec<Vec<PathBuf>>) -> BTreeSet<BTreeSet<PathBuf>> {
    groups.into_iter().map(|g| g.into_iter().collect()).collect()
}

#[test]
fn test_forced_collision_group() {
    // Members a and b differ but are handed over as if their hashes matched.
    let dir = TempDir::new().unwrap();
    let paths = write_all(
        &dir,
        &[
            ("a", b"collision-A-0000"),
            ("b", b"collision-B-0000"),
            ("c", b"collision-B-0000"),
        ],
    );

    let groups = verify_group(&paths, 4, &CancelToken::new());

    assert_eq!(
        as_sets(groups),
        BTreeSet::from([BTreeSet::from([paths[1].clone(), paths[2].clone()])])
    );
}

#[test]
fn test_hash_then_verify_agree() {
    let dir = TempDir::new().unwrap();
    let paths = write_all(
        &dir,
        &[
            ("1", b"aaaaaaaa"),
            ("2", b"bbbbbbbb"),
            ("3", b"aaaaaaaa"),
            ("4", b"bbbbbbbb"),
            ("5", b"cccccccc"),
        ],
    );

    let cancel = CancelToken::new();
    let verified: Vec<_> = hash_group(paths.clone(), 3, &cancel)
        .iter()
        .flat_map(|group| verify_group(group, 3, &cancel))
        .collect();

    assert_eq!(
        as_sets(verified),
        BTreeSet::from([
            BTreeSet::from([paths[0].clone(), paths[2].clone()]),
            BTreeSet::from([paths[1].clone(), paths[3].clone()]),
        ])
    );
}

#[test]
fn test_many_identical_members() {
    let dir = TempDir::new().unwrap();
    let content = vec![7u8; 5_000];
    let paths: Vec<PathBuf> = (0..12)
        .map(|i| {
            let path = dir.path().join(format!("copy{i}"));
            fs::write(&path, &content).unwrap();
            path
        })
        .collect();

    let groups = verify_group(&paths, 512, &CancelToken::new());

    assert_eq!(groups, vec![paths]);
}

#[test]
fn test_cancel_stops_large_verification_promptly() {
    let dir = TempDir::new().unwrap();
    let content = vec![1u8; 8 * 1024 * 1024];
    let paths: Vec<PathBuf> = (0..2)
        .map(|i| {
            let path = dir.path().join(format!("big{i}"));
            fs::write(&path, &content).unwrap();
            path
        })
        .collect();

    let cancel = CancelToken::new();
    let started = Instant::now();
    let groups = thread::scope(|s| {
        s.spawn(|| {
            thread::sleep(Duration::from_millis(2));
            cancel.cancel();
        });
        // One byte per chunk makes the full comparison far slower than the
        // cancellation delay.
        verify_group(&paths, 1, &cancel)
    });

    assert!(groups.is_empty());
    assert!(started.elapsed() < Duration::from_secs(60));
}
