//! Logging setup.
//!
//! The `log` facade is used throughout the crate; this module installs the
//! `env_logger` backend. The level comes from, in priority order:
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! Walk and read failures are logged at warn, per-group stage progress at
//! debug and trace, the final summary at info.
//!
//! Pipeline stages run on named threads (`dupefind-walk`, `dupefind-hash-3`,
//! ...). From `-v` up, the thread name is part of every line.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupefind::logging::init_logging;
//!
//! // -vv
//! init_logging(2, false);
//! log::trace!("every chunk comparison is visible now");
//! ```

use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};
use std::env;
use std::io::Write;
use std::thread;

/// Initialize logging from the CLI verbosity flags.
///
/// Call once, before anything is logged. A second call is ignored with a
/// debug message.
pub fn init_logging(verbose: u8, quiet: bool) {
    if let Err(e) = try_init_logging(verbose, quiet) {
        log::debug!("Logger already initialized: {}", e);
    }
}

/// Initialize logging, reporting an already installed logger as an error.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a global logger is already set.
pub fn try_init_logging(verbose: u8, quiet: bool) -> Result<(), SetLoggerError> {
    let rust_log = env::var("RUST_LOG").ok();

    let mut builder = Builder::new();
    match rust_log {
        Some(_) => {
            builder.parse_default_env();
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
        }
    }

    let detailed = verbose >= 1 || cfg!(debug_assertions);
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if detailed {
            let current = thread::current();
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                current.name().unwrap_or("unnamed"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });

    builder.try_init()?;

    match rust_log {
        Some(spec) => log::debug!("Logging configured from RUST_LOG={}", spec),
        None => log::debug!("Logging initialized at level {}", log::max_level()),
    }
    Ok(())
}

/// Map CLI flags to a level filter.
///
/// `quiet` wins over any verbosity.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}
