//! dupefind - concurrent duplicate file finder.
//!
//! Walks a directory tree and reports groups of byte-identical files.
//! Candidates are narrowed by size, then by a streaming content hash, and
//! finally confirmed by comparing all members chunk by chunk. Confirmed groups
//! are appended to a result file, one comma-separated line per group.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod signal;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderError};
use crate::error::ExitCode;
use crate::output::CsvSink;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable root directory,
/// a result file that cannot be opened or written, and an interrupted scan
/// ([`FinderError::Interrupted`]). Groups confirmed before an interrupt are
/// already in the result file.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref(), &cli.overrides()).context("failed to load configuration")?;

    scanner::raise_open_file_limit();

    let handler = signal::install_handler().context("failed to install Ctrl+C handler")?;
    let finder = DuplicateFinder::new(config.finder_config().with_shutdown_flag(handler.get_flag()));

    let mut sink = CsvSink::append(&config.output).context("error writing result")?;

    let summary = finder.find_duplicates(&cli.path, |group| -> Result<()> {
        sink.write_group(&group).context("error writing result")
    })?;

    if summary.interrupted {
        log::warn!(
            "Scan interrupted after {} duplicate groups; partial results are in {}",
            summary.duplicate_groups,
            config.output.display()
        );
        return Err(FinderError::Interrupted.into());
    }

    log::info!(
        "{} duplicate groups ({} files, {} reclaimable, {:.1}% of {}) written to {}",
        summary.duplicate_groups,
        summary.duplicate_files,
        summary.reclaimable_display(),
        summary.wasted_percentage(),
        summary.total_size_display(),
        config.output.display()
    );

    Ok(ExitCode::Success)
}
