//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::batch::BatchDriver::with_progress`] to receive events as the
//! batch works through its files. The CLI drives its progress bar this way;
//! library users can forward events to a channel, a log or a UI.
//!
//! # Example
//!
//! ```rust
//! use resume2html::{BatchProgressCallback, ConversionResult};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountFailures(AtomicUsize);
//!
//! impl BatchProgressCallback for CountFailures {
//!     fn on_file_complete(&self, _index: usize, _total: usize, result: &ConversionResult) {
//!         if !result.is_success() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::output::{BatchSummary, ConversionResult};
use std::sync::Arc;

/// Called by the batch driver as files start and finish.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_file_start` is called from worker tasks and may run concurrently for
/// different files. `on_file_complete`, `on_file_skipped` and the batch-level
/// events are called from the single driver task.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after enumeration, before any file is converted.
    ///
    /// # Arguments
    /// * `total`   — number of files that will be converted
    /// * `skipped` — number of unsupported files left out
    fn on_batch_start(&self, total: usize, skipped: usize) {
        let _ = (total, skipped);
    }

    /// Called when a worker picks up a file.
    ///
    /// # Arguments
    /// * `index` — 0-based position in input order
    /// * `total` — number of files being converted
    /// * `name`  — input file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file finishes, successfully or not.
    fn on_file_complete(&self, index: usize, total: usize, result: &ConversionResult) {
        let _ = (index, total, result);
    }

    /// Called for each unsupported file found during enumeration.
    fn on_file_skipped(&self, name: &str) {
        let _ = name;
    }

    /// Called once with the final (or partial, if cancelled) summary.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type held by the batch driver.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
