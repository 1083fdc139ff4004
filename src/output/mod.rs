//! Result output.
//!
//! Confirmed duplicate groups are appended to a plain text file, one line
//! per group with the member paths joined by commas.
//!
//! # Example
//!
//! ```no_run
//! use dupefind::duplicates::DuplicateFinder;
//! use dupefind::output::CsvSink;
//! use std::path::Path;
//!
//! let mut sink = CsvSink::append(Path::new("duplifind_result.csv")).unwrap();
//! let finder = DuplicateFinder::with_defaults();
//! finder
//!     .find_duplicates(Path::new("."), |group| -> anyhow::Result<()> {
//!         sink.write_group(&group)?;
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

pub mod csv;

pub use self::csv::{CsvSink, SinkError};
