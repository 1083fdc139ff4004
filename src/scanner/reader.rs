//! Chunked file readers.
//!
//! # Overview
//!
//! [`ChunkedReader`] pulls a file's content as sequential fixed-size chunks.
//! Every chunk except the last is exactly `chunk_size` bytes long; the last
//! one may be shorter, and an exhausted reader yields `None`.
//!
//! [`ParallelReaderSet`] binds N chunked readers to N candidate paths and
//! drives them concurrently, one scoped thread per file. Each thread is the
//! only writer of a bounded channel; the consuming end is a [`ReaderHandle`].
//! The thread owns the open file. Dropping a handle closes its channel, which
//! stops the thread and releases the descriptor. Because the threads are
//! scoped, every descriptor is released by the time the enclosing
//! `std::thread::scope` returns.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::ReadError;
use crate::signal::CancelToken;

/// Chunks buffered per reader thread ahead of the consumer.
const READ_AHEAD: usize = 1;

const READER_THREAD_NAME: &str = "dupefind-read";

/// Sequential fixed-size chunk reader over one open file.
#[derive(Debug)]
pub struct ChunkedReader {
    path: PathBuf,
    file: File,
    chunk_size: usize,
    exhausted: bool,
}

impl ChunkedReader {
    /// Open `path` for chunked reading.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the file cannot be opened.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|e| ReadError::from_io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            chunk_size: chunk_size.max(1),
            exhausted: false,
        })
    }

    /// Path this reader was opened for.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next chunk.
    ///
    /// Returns `Ok(None)` once the file is exhausted, and keeps returning it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Cancelled`] if `cancel` was raised before the
    /// read, or another [`ReadError`] if the read itself fails.
    pub fn next_chunk(&mut self, cancel: &CancelToken) -> Result<Option<Vec<u8>>, ReadError> {
        if cancel.is_cancelled() {
            return Err(ReadError::Cancelled(self.path.clone()));
        }
        if self.exhausted {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::from_io(&self.path, e)),
            }
        }

        // A short chunk is the last one.
        if filled < buf.len() {
            self.exhausted = true;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    /// Move this reader onto a thread of `scope`, returning the consuming
    /// handle of its chunk channel.
    ///
    /// Returns `None` if the thread cannot be started. The file is closed
    /// with the unstarted closure.
    fn spawn<'scope, 'env>(
        self,
        scope: &'scope thread::Scope<'scope, 'env>,
        cancel: &'env CancelToken,
    ) -> Option<ReaderHandle> {
        let (tx, rx) = bounded(READ_AHEAD);
        let path = self.path.clone();
        let started = thread::Builder::new()
            .name(READER_THREAD_NAME.to_string())
            .spawn_scoped(scope, move || self.pump(&tx, cancel));
        accept_started(started, path, rx)
    }

    /// Push chunks into `tx` until EOF, failure, cancellation, or until the
    /// consumer drops its handle. The file is closed when this returns.
    fn pump(mut self, tx: &Sender<Result<Vec<u8>, ReadError>>, cancel: &CancelToken) {
        loop {
            match self.next_chunk(cancel) {
                Ok(Some(data)) => {
                    if tx.send(Ok(data)).is_err() {
                        log::trace!("Reader closed by consumer: {}", self.path.display());
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    if !e.is_cancelled() {
                        log::warn!("Could not read file content: {}", e);
                    }
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    }
}

/// Turn the outcome of starting a reader thread into its handle.
fn accept_started<T>(
    started: io::Result<T>,
    path: PathBuf,
    chunks: Receiver<Result<Vec<u8>, ReadError>>,
) -> Option<ReaderHandle> {
    match started {
        Ok(_) => Some(ReaderHandle { path, chunks }),
        Err(e) => {
            log::warn!("Could not start reader for {}: {}", path.display(), e);
            None
        }
    }
}

/// One step of a [`ReaderHandle`].
#[derive(Debug)]
pub enum Chunk {
    /// The next chunk of content.
    Data(Vec<u8>),
    /// The stream is exhausted.
    End,
    /// Reading failed; the stream yields nothing further.
    Failed(ReadError),
}

/// Consuming end of one reader's chunk channel.
#[derive(Debug)]
pub struct ReaderHandle {
    path: PathBuf,
    chunks: Receiver<Result<Vec<u8>, ReadError>>,
}

impl ReaderHandle {
    /// Path of the file behind this handle.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle and keep only its path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Block until the next chunk arrives.
    pub fn next_chunk(&self) -> Chunk {
        match self.chunks.recv() {
            Ok(Ok(data)) => Chunk::Data(data),
            Ok(Err(e)) => Chunk::Failed(e),
            // The reader thread hung up: EOF, or it stopped after an error it
            // already reported.
            Err(_) => Chunk::End,
        }
    }
}

/// N chunked readers bound to N candidate paths.
#[derive(Debug, Default)]
pub struct ParallelReaderSet {
    readers: Vec<ChunkedReader>,
}

impl ParallelReaderSet {
    /// Open a reader for every path that can be opened.
    ///
    /// Paths that fail to open are logged and left out; they never fail the
    /// set as a whole.
    #[must_use]
    pub fn open(paths: &[PathBuf], chunk_size: usize) -> Self {
        let readers = paths
            .iter()
            .filter_map(|path| match ChunkedReader::open(path, chunk_size) {
                Ok(reader) => Some(reader),
                Err(e) => {
                    log::warn!("Could not open file for reading: {}", e);
                    None
                }
            })
            .collect();
        Self { readers }
    }

    /// Number of successfully opened readers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Whether no reader could be opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Paths of the opened readers, in open order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.readers.iter().map(ChunkedReader::path)
    }

    /// Start one reading thread per reader on `scope` and return the handles,
    /// in open order.
    ///
    /// A reader whose thread cannot be started is logged and left out, like
    /// a file that fails to open.
    pub fn drive<'scope, 'env>(
        self,
        scope: &'scope thread::Scope<'scope, 'env>,
        cancel: &'env CancelToken,
    ) -> Vec<ReaderHandle> {
        self.readers
            .into_iter()
            .filter_map(|reader| reader.spawn(scope, cancel))
            .collect()
    }
}
