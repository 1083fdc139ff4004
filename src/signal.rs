//! Signal handling and cancellation.
//!
//! This module provides centralized Ctrl+C handling for dupefind and the
//! [`CancelToken`] used to abort a single bytewise verification.
//!
//! The global [`ShutdownHandler`] wraps an `AtomicBool` that is raised when
//! Ctrl+C is received. Every stage of the pipeline observes it. A
//! [`CancelToken`] adds one more flag on top of it, scoped to one verifier
//! invocation. Cancelling an invocation leaves the others running.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupefind::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//!
//! // Pass the flag to the finder
//! let shutdown_flag = handler.get_flag();
//!
//! if handler.is_shutdown_requested() {
//!     println!("Shutdown requested, cleaning up...");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Centralized shutdown handler for graceful application termination.
///
/// `ShutdownHandler` is `Send` and `Sync`; clones share the same flag.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new shutdown handler with the flag initially set to `false`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the shutdown flag for passing to the pipeline.
    ///
    /// ```rust,no_run
    /// use dupefind::signal::ShutdownHandler;
    /// use dupefind::duplicates::FinderConfig;
    ///
    /// let handler = ShutdownHandler::new();
    /// let config = FinderConfig::default()
    ///     .with_shutdown_flag(handler.get_flag());
    /// ```
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the shutdown flag to `false`.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation signal scoped to one unit of work.
///
/// A token is cancelled when its own flag is raised or when any flag it
/// inherited is raised: the global shutdown flag it was created with, and the
/// flags of the tokens it is a child of. Cancelling a token never touches
/// what it inherited.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    inherited: Vec<Arc<AtomicBool>>,
}

impl CancelToken {
    /// Create a free-standing token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also observes the given shutdown flag.
    #[must_use]
    pub fn with_parent(parent: Option<Arc<AtomicBool>>) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            inherited: parent.into_iter().collect(),
        }
    }

    /// Create a fresh token that is cancelled whenever this one is.
    ///
    /// Cancelling the child leaves this token alone.
    #[must_use]
    pub fn child(&self) -> Self {
        let mut inherited = self.inherited.clone();
        inherited.push(Arc::clone(&self.flag));
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            inherited,
        }
    }

    /// Raise this token's flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether this token or anything it inherited was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.inherited.iter().any(|f| f.load(Ordering::SeqCst))
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a Ctrl+C handler that sets the shutdown flag on interrupt.
///
/// If a handler is already installed (e.g. in tests), the existing one is
/// reset and returned. If the `ctrlc` hook was registered elsewhere, an
/// unhooked handler is returned; it still works via `request_shutdown()`.
///
/// # Errors
///
/// Currently always succeeds; the `Result` is kept for callers that want to
/// surface installation failures.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(e) => {
            if let Some(handler) = GLOBAL_HANDLER.get() {
                handler.reset();
                Ok(handler.clone())
            } else {
                log::debug!("Ctrl+C handler not installed ({}), using unhooked handler", e);
                let fallback = ShutdownHandler::new();
                let _ = GLOBAL_HANDLER.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}
