//! Content-hash narrowing of size candidates.
//!
//! Each worker takes one size-candidate group, hashes every member with a
//! [`ContentHasher`] keyed for that group, and forwards the hash groups with
//! 2+ members. Members that cannot be read are logged and dropped. Equal
//! hashes are not proof of equality; the byte verifier settles that.

use std::io;

use crossbeam_channel::Receiver;

use super::groups::{filter_duplicates, split_empty, CandidateGroup, GroupingTable};
use super::stage::WorkerPool;
use crate::scanner::{ContentHash, ContentHasher, DEFAULT_CHUNK_SIZE};
use crate::signal::CancelToken;

/// Default number of hashing workers.
pub const HASH_WORKERS: usize = 16;

/// Capacity of the hash stage's output queue.
pub const HASH_QUEUE_CAPACITY: usize = 1024;

/// Split one size-candidate group by content hash.
///
/// Returns the sub-groups of 2+ paths whose hashes match. Empty members are
/// forwarded as one group without being opened. If `cancel` is raised while
/// hashing, the group is abandoned and nothing is returned.
#[must_use]
pub fn hash_group(group: CandidateGroup, chunk_size: usize, cancel: &CancelToken) -> Vec<CandidateGroup> {
    if group.len() < 2 {
        return Vec::new();
    }

    let (empty, sized) = split_empty(&group);
    let hasher = ContentHasher::new(chunk_size);
    let mut table: GroupingTable<ContentHash> = GroupingTable::new();

    for path in sized {
        match hasher.hash_file(&path, cancel) {
            Ok(hash) => {
                log::trace!("Hashed {}: {:016x}", path.display(), hash.0);
                table.insert(hash, path);
            }
            Err(e) if e.is_cancelled() => {
                log::debug!("Hashing cancelled");
                return Vec::new();
            }
            Err(e) => log::warn!("Failed to hash, dropping candidate: {}", e),
        }
    }

    let mut groups: Vec<CandidateGroup> = filter_duplicates(table).collect();
    if empty.len() > 1 {
        groups.push(empty);
    }
    groups
}

/// Bounded pool of hashing workers.
#[derive(Debug, Clone)]
pub struct HashStage {
    workers: usize,
    chunk_size: usize,
    cancel: CancelToken,
}

impl Default for HashStage {
    fn default() -> Self {
        Self {
            workers: HASH_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: CancelToken::new(),
        }
    }
}

impl HashStage {
    /// Create a hash stage with the given chunk size and default worker count.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..Self::default()
        }
    }

    /// Set the number of workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the cancellation token observed by every file read.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start the workers on `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be started.
    pub fn spawn(self, input: Receiver<CandidateGroup>) -> io::Result<WorkerPool<CandidateGroup>> {
        let Self {
            workers,
            chunk_size,
            cancel,
        } = self;
        log::debug!("Starting hash stage with {} workers", workers);

        WorkerPool::spawn("dupefind-hash", workers, input, HASH_QUEUE_CAPACITY, move |group| {
            hash_group(group, chunk_size, &cancel)
        })
    }
}
