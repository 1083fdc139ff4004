//! Duplicate finder pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder`] wires the stages together with bounded queues:
//!
//! 1. **Walk** - [`Walker`] streams every regular file under the root
//! 2. **Size grouping** - files are grouped by exact byte size
//! 3. **Filter** - only sizes shared by 2+ files go on
//! 4. **Hash** - [`HashStage`] splits each size group by content hash
//! 5. **Verify** - [`ByteVerifyStage`] compares members byte by byte
//!
//! Confirmed groups are handed to the caller on the calling thread. A slow
//! caller slows down every stage behind it; nothing is buffered beyond the
//! queue capacities.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_chunk_size(64 * 1024));
//! let (groups, summary) = finder.collect_duplicates(Path::new(".")).unwrap();
//!
//! for group in &groups {
//!     println!("{} copies", group.len());
//! }
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use crossbeam_channel::{bounded, Sender};

use super::groups::{filter_duplicates, group_by_size, CandidateGroup, GroupingStats};
use super::hash_stage::{HashStage, HASH_WORKERS};
use super::verify::{ByteVerifyStage, VERIFY_WORKERS};
use crate::scanner::{Walker, WalkerConfig, DEFAULT_CHUNK_SIZE};
use crate::signal::CancelToken;

/// Capacity of the queue between size grouping and hashing.
pub const SIZE_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the duplicate finder.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Bytes per read when hashing and verifying.
    pub chunk_size: usize,
    /// Number of hashing workers.
    pub hash_workers: usize,
    /// Number of byte verification workers.
    pub verify_workers: usize,
    /// Walker configuration.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hash_workers: HASH_WORKERS,
            verify_workers: VERIFY_WORKERS,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
        }
    }
}

impl FinderConfig {
    /// Set the chunk size used for every file read.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the number of hashing workers.
    #[must_use]
    pub fn with_hash_workers(mut self, workers: usize) -> Self {
        self.hash_workers = workers.max(1);
        self
    }

    /// Set the number of byte verification workers.
    #[must_use]
    pub fn with_verify_workers(mut self, workers: usize) -> Self {
        self.verify_workers = workers.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files found by the walk
    pub total_files: usize,
    /// Combined size of those files in bytes
    pub total_bytes: u64,
    /// Number of files that shared their size with another file
    pub size_candidates: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Number of duplicate files, not counting one original per group
    pub duplicate_files: usize,
    /// Space that removing the duplicates would free
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Whether the scan was stopped by the shutdown flag
    pub interrupted: bool,
}

impl ScanSummary {
    /// Calculate the percentage of scanned bytes taken up by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_bytes as f64) * 100.0
        }
    }

    /// Format reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format the scanned size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_bytes).to_string()
    }

    fn record_group(&mut self, group: &CandidateGroup) {
        let copies = group.len().saturating_sub(1);
        self.duplicate_groups += 1;
        self.duplicate_files += copies;

        // Sizes are dropped with the grouping keys; one stat per group is
        // enough to get them back.
        if let Some(size) = group.first().and_then(|p| fs::metadata(p).ok()).map(|m| m.len()) {
            self.reclaimable_space += size * copies as u64;
        }
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A pipeline thread could not be started, or the root could not be
    /// inspected.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A pipeline thread panicked.
    #[error("Pipeline stage '{0}' panicked")]
    StagePanicked(&'static str),
}

/// Duplicate finder that runs the whole pipeline for one root directory.
///
/// Every call re-walks the tree; nothing is cached between runs.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration this finder runs with.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run the pipeline over `root`, handing each confirmed group to
    /// `on_group` as soon as it is verified.
    ///
    /// Groups arrive in no particular order. Within a group, paths are in the
    /// order they were opened for verification.
    ///
    /// # Errors
    ///
    /// Fails before any stage starts if `root` does not exist or is not a
    /// directory, or if a stage thread cannot be spawned. If `on_group`
    /// returns an error, the pipeline is cancelled, every stage is joined and
    /// the error is returned.
    pub fn find_duplicates<F, E>(&self, root: &Path, mut on_group: F) -> Result<ScanSummary, E>
    where
        F: FnMut(CandidateGroup) -> Result<(), E>,
        E: From<FinderError>,
    {
        let start_time = Instant::now();
        check_root(root)?;

        log::info!("Starting duplicate scan of {}", root.display());

        let cancel = CancelToken::with_parent(self.config.shutdown_flag.clone());

        let (size_tx, size_rx) = bounded(SIZE_QUEUE_CAPACITY);
        let grouper = self.spawn_grouper(root, size_tx, cancel.clone())?;

        let (hash_out, hash_coordinator) = HashStage::new(self.config.chunk_size)
            .with_workers(self.config.hash_workers)
            .with_cancel(cancel.clone())
            .spawn(size_rx)
            .map_err(FinderError::from)?
            .into_parts();

        let (results, verify_coordinator) = ByteVerifyStage::new(self.config.chunk_size)
            .with_workers(self.config.verify_workers)
            .with_cancel(cancel.clone())
            .spawn(hash_out)
            .map_err(FinderError::from)?
            .into_parts();

        let mut summary = ScanSummary::default();
        let mut failure = None;

        for group in &results {
            log::trace!("Delivering group: {:?}", group);
            summary.record_group(&group);
            if let Err(e) = on_group(group) {
                cancel.cancel();
                failure = Some(e);
                break;
            }
        }
        // Upstream workers blocked on a full queue fail their send once the
        // receiver is gone and wind down.
        drop(results);

        let joined = join_stage(verify_coordinator, "verify")
            .and_then(|()| join_stage(hash_coordinator, "hash"))
            .and_then(|()| {
                grouper
                    .join()
                    .map_err(|_| FinderError::StagePanicked("group"))
            });

        if let Some(e) = failure {
            return Err(e);
        }
        let stats = joined?;

        summary.total_files = stats.total_files;
        summary.total_bytes = stats.total_bytes;
        summary.size_candidates = stats.potential_duplicates;
        summary.interrupted = cancel.is_cancelled();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} files, {} duplicate groups, {} reclaimable in {:.2?}",
            summary.total_files,
            summary.duplicate_groups,
            summary.reclaimable_display(),
            summary.scan_duration
        );

        Ok(summary)
    }

    /// Run the pipeline over `root` and collect every confirmed group.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateFinder::find_duplicates`].
    pub fn collect_duplicates(&self, root: &Path) -> Result<(Vec<CandidateGroup>, ScanSummary), FinderError> {
        let mut groups = Vec::new();
        let summary = self.find_duplicates(root, |group| -> Result<(), FinderError> {
            groups.push(group);
            Ok(())
        })?;
        Ok((groups, summary))
    }

    /// Walk, group by size and feed the size-duplicate groups to `output`.
    fn spawn_grouper(
        &self,
        root: &Path,
        output: Sender<CandidateGroup>,
        cancel: CancelToken,
    ) -> Result<JoinHandle<GroupingStats>, FinderError> {
        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let handle = thread::Builder::new()
            .name("dupefind-group".to_string())
            .spawn(move || {
                let records = walker.walk().take_while(|_| !cancel.is_cancelled());
                let (table, stats) = group_by_size(records);

                log::info!(
                    "Found {} files ({}), {} share a size with another file",
                    stats.total_files,
                    ByteSize(stats.total_bytes),
                    stats.potential_duplicates
                );

                for group in filter_duplicates(table) {
                    if cancel.is_cancelled() || output.send(group).is_err() {
                        log::debug!("Size grouping stopped early");
                        break;
                    }
                }
                stats
            })?;

        Ok(handle)
    }
}

fn check_root(root: &Path) -> Result<(), FinderError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FinderError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FinderError::PathNotFound(root.to_path_buf())),
        Err(e) => Err(FinderError::Io(e)),
    }
}

fn join_stage(handle: JoinHandle<()>, name: &'static str) -> Result<(), FinderError> {
    handle.join().map_err(|_| FinderError::StagePanicked(name))
}
