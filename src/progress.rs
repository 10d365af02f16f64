//! Progress-callback trait for per-table pipeline events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractorConfigBuilder::progress_callback`] to receive
//! events as tables are cleaned and summarised.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdftables::{ExtractionProgressCallback, ExtractorConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_table_complete(&self, table_index: usize, total_tables: usize, summary_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Table {}/{} summarised ({} bytes)", table_index, total_tables, summary_len);
//!     }
//! }
//!
//! let config = ExtractorConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each table.
///
/// Summaries run concurrently, so `on_table_start`, `on_table_complete` and
/// `on_table_error` may be invoked from different tasks at the same time.
/// All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after table detection, before any summary is requested.
    fn on_extraction_start(&self, total_tables: usize) {
        let _ = total_tables;
    }

    /// Called just before the generation request for a table is sent.
    ///
    /// # Arguments
    /// * `table_index`: 1-indexed table number in detection order
    /// * `total_tables`: number of detected tables
    fn on_table_start(&self, table_index: usize, total_tables: usize) {
        let _ = (table_index, total_tables);
    }

    /// Called when a table has been cleaned and summarised.
    fn on_table_complete(&self, table_index: usize, total_tables: usize, summary_len: usize) {
        let _ = (table_index, total_tables, summary_len);
    }

    /// Called when cleaning or summarising a table failed.
    fn on_table_error(&self, table_index: usize, total_tables: usize, error: &str) {
        let _ = (table_index, total_tables, error);
    }

    /// Called once after every table has been attempted.
    fn on_extraction_complete(&self, total_tables: usize, success_count: usize) {
        let _ = (total_tables, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractorConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
