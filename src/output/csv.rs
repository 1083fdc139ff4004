//! Append-only result file.
//!
//! Each confirmed group becomes one line: the member paths joined by commas,
//! terminated by `\n`. There is no header row and nothing is quoted, so a
//! path containing a comma is written as is. Non-UTF-8 paths are converted
//! lossily. Existing file contents are never touched.
//!
//! # Example
//!
//! ```
//! use dupefind::output::CsvSink;
//! use std::path::PathBuf;
//!
//! let mut sink = CsvSink::new(Vec::new());
//! sink.write_group(&[PathBuf::from("a.txt"), PathBuf::from("b.txt")]).unwrap();
//!
//! assert_eq!(sink.into_inner().unwrap(), b"a.txt,b.txt\n");
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use thiserror::Error;

/// Errors that can occur while writing results.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The result file could not be opened for appending.
    #[error("Failed to open result file {path}: {source}")]
    Open {
        /// Path of the result file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A group could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Buffered lines could not be flushed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Writes one comma-joined line per duplicate group.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    groups_written: usize,
}

impl CsvSink<File> {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] if the file cannot be opened.
    pub fn append(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Appending results to {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap an arbitrary writer.
    pub fn new(writer: W) -> Self {
        let writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        Self {
            writer,
            groups_written: 0,
        }
    }

    /// Write one group as a single line and flush it.
    ///
    /// Flushing per group keeps every confirmed group on disk even if the
    /// scan is interrupted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if writing or flushing fails.
    pub fn write_group(&mut self, group: &[PathBuf]) -> Result<(), SinkError> {
        if group.is_empty() {
            return Ok(());
        }
        self.writer
            .write_record(group.iter().map(|path| path.to_string_lossy().into_owned()))?;
        self.writer.flush()?;
        self.groups_written += 1;
        Ok(())
    }

    /// Write every group from `groups`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`SinkError`] encountered.
    pub fn append_all<I>(&mut self, groups: I) -> Result<usize, SinkError>
    where
        I: IntoIterator,
        I::Item: AsRef<[PathBuf]>,
    {
        let before = self.groups_written;
        for group in groups {
            self.write_group(group.as_ref())?;
        }
        Ok(self.groups_written - before)
    }

    /// Number of groups written so far.
    #[must_use]
    pub fn groups_written(&self) -> usize {
        self.groups_written
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Io`] if the final flush fails.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}
