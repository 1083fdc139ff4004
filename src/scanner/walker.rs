//! Concurrent directory walker.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory tree
//! and streaming [`FileRecord`]s for every regular file found.
//!
//! Every directory is listed by its own task on a rayon scope. A task lists
//! its directory in pages of `page_size` entries, sends file records to a
//! bounded queue and spawns a new task for every subdirectory. The scope is
//! the task group: it only returns when every task has finished, including
//! tasks spawned by tasks. Only then is the queue closed, which ends the
//! [`Walk`] iterator on the consumer side.
//!
//! # Features
//!
//! - One task per directory on a dedicated thread pool
//! - Symbolic links are never followed or reported
//! - Failures are logged and isolated to the entry or subtree
//! - Backpressure from the consumer via a bounded queue
//! - Graceful shutdown via atomic flag, or by dropping the [`Walk`]
//!
//! # Example
//!
//! ```no_run
//! use dupefind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let total: u64 = walker.walk().map(|record| record.size).sum();
//! println!("{} bytes", total);
//! ```

use std::ffi::OsStr;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use super::{FileRecord, ScanError, WalkerConfig, WALK_QUEUE_CAPACITY};

/// Directory walker for concurrent file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// ```no_run
    /// use dupefind::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, running tasks stop listing and no new
    /// directories are entered.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Start walking the directory tree.
    ///
    /// The walk runs in the background; the returned [`Walk`] yields records
    /// as they are discovered. Each call starts a fresh scan. Errors are
    /// logged and skipped, never yielded.
    #[must_use]
    pub fn walk(&self) -> Walk {
        let (tx, rx) = bounded(WALK_QUEUE_CAPACITY);
        let root = self.root.clone();
        let config = self.config.clone();
        let shutdown_flag = self.shutdown_flag.clone();

        let worker = thread::Builder::new()
            .name("dupefind-walk".to_string())
            .spawn(move || run_walk(root, &config, shutdown_flag, tx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The sender went down with the closure, so the walk is empty.
                log::error!("Failed to start directory walk: {}", e);
                None
            }
        };

        Walk {
            records: Some(rx),
            worker,
        }
    }
}

/// A running directory walk.
///
/// Iterates the discovered [`FileRecord`]s in discovery order. Dropping the
/// walk before it is exhausted stops the traversal and waits for the
/// background tasks to finish.
#[derive(Debug)]
pub struct Walk {
    records: Option<Receiver<FileRecord>>,
    worker: Option<JoinHandle<()>>,
}

impl Iterator for Walk {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        self.records.as_ref()?.recv().ok()
    }
}

impl Drop for Walk {
    fn drop(&mut self) {
        // Hang up first so that tasks blocked on a full queue wake up.
        drop(self.records.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Directory walk thread panicked");
            }
        }
    }
}

/// State shared by every task of one walk.
struct WalkContext {
    records: Sender<FileRecord>,
    page_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Raised once the consumer has hung up.
    abandoned: AtomicBool,
}

impl WalkContext {
    fn is_stopped(&self) -> bool {
        self.abandoned.load(Ordering::Relaxed)
            || self
                .shutdown_flag
                .as_ref()
                .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Send a record, returning `false` if the walk should stop.
    fn emit(&self, record: FileRecord) -> bool {
        if self.records.send(record).is_err() {
            self.abandoned.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }
}

fn run_walk(
    root: PathBuf,
    config: &WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    records: Sender<FileRecord>,
) {
    let ctx = WalkContext {
        records,
        page_size: config.page_size.max(1),
        shutdown_flag,
        abandoned: AtomicBool::new(false),
    };

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("dupefind-walk-{i}"));
    if let Some(threads) = config.threads {
        builder = builder.num_threads(threads);
    }

    log::debug!("Walking {}", root.display());
    match builder.build() {
        Ok(pool) => pool.scope(|s| walk_dir(s, &ctx, root)),
        Err(e) => {
            log::warn!(
                "Failed to create walker thread pool, using global pool with {} threads: {}",
                rayon::current_num_threads(),
                e
            );
            rayon::scope(|s| walk_dir(s, &ctx, root));
        }
    }
    log::debug!("Directory walk complete");
}

/// List one directory, emitting its files and spawning a task per
/// subdirectory.
fn walk_dir<'scope>(scope: &rayon::Scope<'scope>, ctx: &'scope WalkContext, dir: PathBuf) {
    if ctx.is_stopped() {
        return;
    }

    let mut entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Failed to open directory: {}", ScanError::from_io(&dir, e));
            return;
        }
    };

    let mut page: Vec<DirEntry> = Vec::with_capacity(ctx.page_size);
    loop {
        for entry in entries.by_ref().take(ctx.page_size) {
            match entry {
                Ok(entry) => page.push(entry),
                Err(e) => {
                    log::warn!("Failed to read directory entries: {}", ScanError::from_io(&dir, e));
                    break;
                }
            }
        }
        if page.is_empty() {
            return;
        }
        let last_page = page.len() < ctx.page_size;

        for entry in page.drain(..) {
            if ctx.is_stopped() {
                return;
            }
            let path = child_path(&dir, &entry.file_name());

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    log::warn!("Failed to read file type: {}", ScanError::from_io(&path, e));
                    continue;
                }
            };

            if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", path.display());
            } else if file_type.is_dir() {
                scope.spawn(move |s| walk_dir(s, ctx, path));
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => {
                        if !ctx.emit(FileRecord::new(path, metadata.len())) {
                            return;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read file infos: {}", ScanError::from_io(&path, e));
                    }
                }
            } else {
                log::trace!("Skipping special file: {}", path.display());
            }
        }

        if last_page {
            return;
        }
    }
}

/// Join a directory entry name onto its directory, dropping a leading `./`.
fn child_path(dir: &Path, name: &OsStr) -> PathBuf {
    if dir == Path::new(".") {
        PathBuf::from(name)
    } else {
        dir.join(name)
    }
}
