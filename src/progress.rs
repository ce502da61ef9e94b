//! Progress-callback trait for per-artifact processing events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::ProcessingConfigBuilder::progress_callback`] to receive
//! events as the pipeline generates each preview and thumbnail. The CLI
//! drives a terminal progress bar from these; the HTTP server leaves it unset.

use std::sync::Arc;
use uuid::Uuid;

/// Called by [`crate::process::process_file`] as it works through a file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once the page count is known, before any artifact is rendered.
    fn on_processing_start(&self, file_id: Uuid, planned_artifacts: usize) {
        let _ = (file_id, planned_artifacts);
    }

    /// Called after an artifact has been uploaded.
    ///
    /// # Arguments
    /// * `storage_path`: where the JPEG now lives in the bucket
    /// * `bytes`: encoded size
    fn on_artifact_complete(&self, storage_path: &str, bytes: usize) {
        let _ = (storage_path, bytes);
    }

    /// Called when an artifact is skipped because a step failed.
    fn on_artifact_error(&self, label: &str, error: &str) {
        let _ = (label, error);
    }

    /// Called once after every artifact has been attempted.
    fn on_processing_complete(&self, file_id: Uuid, succeeded: usize, failed: usize) {
        let _ = (file_id, succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ProcessingConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        planned: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ProcessingProgressCallback for TrackingCallback {
        fn on_processing_start(&self, _file_id: Uuid, planned_artifacts: usize) {
            self.planned.store(planned_artifacts, Ordering::SeqCst);
        }

        fn on_artifact_complete(&self, _storage_path: &str, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_artifact_error(&self, _label: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_processing_complete(&self, _file_id: Uuid, succeeded: usize, _failed: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let id = Uuid::new_v4();
        cb.on_processing_start(id, 8);
        cb.on_artifact_complete("previews/x/page-1-small.jpg", 1024);
        cb.on_artifact_error("thumbnail 2", "boom");
        cb.on_processing_complete(id, 7, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let id = Uuid::new_v4();

        tracker.on_processing_start(id, 4);
        tracker.on_artifact_complete("a", 1);
        tracker.on_artifact_complete("b", 2);
        tracker.on_artifact_error("thumbnail 1", "render");
        tracker.on_processing_complete(id, 2, 1);

        assert_eq!(tracker.planned.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }
}
