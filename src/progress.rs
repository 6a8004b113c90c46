//! Progress-callback trait for per-file and per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the inputs.
//!
//! # Example
//!
//! ```rust
//! use edgequake_scan2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, file_index: usize, page_num: usize, regions: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("file {} page {}: {} regions", file_index, page_num, regions);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each file and page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `file_index` is the 0-based position in the input
/// list.
///
/// # Thread safety
///
/// With `file_concurrency > 1`, events for different files may arrive
/// concurrently from different tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first file is opened.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file has been rasterised.
    fn on_file_start(&self, file_index: usize, input: &str, pages: usize) {
        let _ = (file_index, input, pages);
    }

    /// Called when a page has been annotated.
    ///
    /// # Arguments
    /// * `page_num` — 1-indexed page number within the file
    /// * `regions`  — regions drawn on the page
    fn on_page_complete(&self, file_index: usize, page_num: usize, regions: usize) {
        let _ = (file_index, page_num, regions);
    }

    /// Called when a file is dropped from the output.
    fn on_file_error(&self, file_index: usize, input: &str, error: &str) {
        let _ = (file_index, input, error);
    }

    /// Called when every page of a file has been annotated.
    fn on_file_complete(&self, file_index: usize, input: &str, pages: usize) {
        let _ = (file_index, input, pages);
    }

    /// Called once after all files have been attempted, before assembly.
    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_complete(&self, _file_index: usize, _page_num: usize, _regions: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _file_index: usize, _input: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total_files: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_file_start(0, "a.pdf", 3);
        cb.on_page_complete(0, 1, 12);
        cb.on_file_error(1, "b.png", "File not found");
        cb.on_file_complete(0, "a.pdf", 3);
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_complete(0, 1, 4);
        tracker.on_page_complete(0, 2, 0);
        tracker.on_file_error(1, "b.png", "File not found");
        tracker.on_run_complete(2, 1);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1);
        cb.on_file_start(0, "scan.png", 1);
    }
}
