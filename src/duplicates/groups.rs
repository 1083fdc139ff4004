//! Grouping tables and the duplicate filter.
//!
//! # Overview
//!
//! A [`GroupingTable`] maps a key (file size, content hash) to the paths that
//! share it. The same table type and the same [`filter_duplicates`] operator
//! serve every stage; the key type is a generic parameter, so there is no
//! runtime check of which kind of table is being filtered.
//!
//! ## Size Grouping
//!
//! Size grouping is the first narrowing step. Files with different sizes
//! cannot be duplicates, so only groups with 2+ files go on to hashing.
//!
//! # Example
//!
//! ```
//! use dupefind::scanner::FileRecord;
//! use dupefind::duplicates::{filter_duplicates, group_by_size};
//! use std::path::PathBuf;
//!
//! let records = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048),
//! ];
//!
//! let (table, stats) = group_by_size(records);
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//!
//! let groups: Vec<_> = filter_duplicates(table).collect();
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::PathBuf;

use crate::scanner::{FileRecord, ReadError};

/// Ordered paths believed equal under some criterion.
///
/// Keys are dropped after filtering; only the paths travel downstream.
pub type CandidateGroup = Vec<PathBuf>;

/// Paths grouped by a shared key.
///
/// Built by a single task; insertion order within a group is preserved.
#[derive(Debug, Clone)]
pub struct GroupingTable<K> {
    groups: HashMap<K, CandidateGroup>,
}

impl<K: Eq + Hash> GroupingTable<K> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Append `path` to the group for `key`.
    pub fn insert(&mut self, key: K, path: PathBuf) {
        self.groups.entry(key).or_default().push(path);
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the table has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The group for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&CandidateGroup> {
        self.groups.get(key)
    }

    /// Total number of paths across all groups.
    #[must_use]
    pub fn total_paths(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Number of paths in groups that have 2+ members.
    #[must_use]
    pub fn duplicate_paths(&self) -> usize {
        self.groups
            .values()
            .filter(|group| group.len() > 1)
            .map(Vec::len)
            .sum()
    }
}

impl<K: Eq + Hash> Default for GroupingTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FromIterator<(K, PathBuf)> for GroupingTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, PathBuf)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, path) in iter {
            table.insert(key, path);
        }
        table
    }
}

impl<K> IntoIterator for GroupingTable<K> {
    type Item = (K, CandidateGroup);
    type IntoIter = std::collections::hash_map::IntoIter<K, CandidateGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Emit every group of `table` that has more than one member.
///
/// Groups of 0 or 1 paths are dropped silently. Works the same for any key
/// type.
pub fn filter_duplicates<K>(table: GroupingTable<K>) -> impl Iterator<Item = CandidateGroup> {
    table
        .into_iter()
        .filter_map(|(_, group)| (group.len() > 1).then_some(group))
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Number of files consumed
    pub total_files: usize,
    /// Combined size of all files consumed
    pub total_bytes: u64,
    /// Number of files sharing their size with at least one other file
    pub potential_duplicates: usize,
    /// Number of sizes shared by 2+ files
    pub candidate_groups: usize,
}

/// Group file records by exact byte size.
///
/// Blocks until `records` is exhausted, then returns the completed table.
#[must_use]
pub fn group_by_size<I>(records: I) -> (GroupingTable<u64>, GroupingStats)
where
    I: IntoIterator<Item = FileRecord>,
{
    let mut table = GroupingTable::new();
    let mut stats = GroupingStats::default();

    for record in records {
        stats.total_files += 1;
        stats.total_bytes += record.size;
        table.insert(record.size, record.path);
    }

    stats.potential_duplicates = table.duplicate_paths();
    stats.candidate_groups = table.groups.values().filter(|g| g.len() > 1).count();

    log::debug!(
        "Size grouping: {} files, {} sizes, {} potential duplicates",
        stats.total_files,
        table.len(),
        stats.potential_duplicates
    );

    (table, stats)
}

/// Split a candidate group into its empty members and the rest.
///
/// Empty files are identical by definition, so they never need to be opened.
/// Members whose metadata cannot be read are logged and dropped. Both halves
/// keep the input order.
#[must_use]
pub fn split_empty(paths: &[PathBuf]) -> (CandidateGroup, CandidateGroup) {
    let mut empty = Vec::new();
    let mut sized = Vec::with_capacity(paths.len());

    for path in paths {
        match fs::metadata(path) {
            Ok(meta) if meta.len() == 0 => empty.push(path.clone()),
            Ok(_) => sized.push(path.clone()),
            Err(e) => log::warn!("Dropping candidate: {}", ReadError::from_io(path, e)),
        }
    }

    (empty, sized)
}
