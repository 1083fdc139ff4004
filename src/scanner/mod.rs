//! Scanner module for directory traversal and file reading.
//!
//! This module provides functionality for:
//! - Concurrent directory walking on a rayon task group
//! - Chunked, cancellable file reading (single and N-way parallel)
//! - Streaming content hashing
//! - Open-file limits
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`reader`]: Chunked readers and the parallel reader set
//! - [`limits`]: Open-file budget for the parallel readers
//! - [`hasher`]: Seeded streaming content hash
//!
//! # Example
//!
//! ```no_run
//! use dupefind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for record in walker.walk() {
//!     println!("{}: {} bytes", record.path.display(), record.size);
//! }
//! ```

pub mod hasher;
pub mod limits;
pub mod reader;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};

pub use hasher::{ContentHash, ContentHasher};
pub use limits::{raise_open_file_limit, readers_per_group};
pub use reader::{Chunk, ChunkedReader, ParallelReaderSet, ReaderHandle};
pub use walker::{Walk, Walker};

/// Default chunk size in bytes used for hashing and verification.
pub const DEFAULT_CHUNK_SIZE: usize = 104_856;

/// Default number of directory entries listed per page.
pub const DEFAULT_PAGE_SIZE: usize = 128;

/// Capacity of the queue between the walker and its consumer.
pub const WALK_QUEUE_CAPACITY: usize = 1024;

/// Metadata for a discovered regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path to the file, rooted at the walk root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileRecord {
    /// Create a new FileRecord.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Number of directory entries listed per page.
    pub page_size: usize,
    /// Threads in the walker's pool. `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            threads: None,
        }
    }
}

impl WalkerConfig {
    /// Set the page size (clamped to at least 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the number of walker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file or directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur while reading file content.
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The read was abandoned because cancellation was requested.
    #[error("Read cancelled: {0}")]
    Cancelled(PathBuf),
}

impl ReadError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether this error only reports a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
