//! Progress-event trait for the extraction pipeline.
//!
//! Inject an [`Arc<dyn ExtractionProgress>`] via
//! [`crate::config::ExtractionConfigBuilder::progress`] to receive events as
//! the run moves through its stages. The CLI uses this to render its numbered
//! progress lines; library embedders can forward the events anywhere.
//!
//! All methods have default no-op implementations so callers only override
//! what they care about. The trait is `Send + Sync`; the pipeline itself is
//! sequential, so events always arrive in stage order.

use crate::output::ExtractionStats;
use std::path::Path;

/// Called by the pipeline as the run progresses.
pub trait ExtractionProgress: Send + Sync {
    /// Called once before any work, after the credential check passed.
    fn on_start(&self, input: &Path) {
        let _ = input;
    }

    /// Called when the PDF has been uploaded to the file service.
    fn on_upload_complete(&self, bytes: u64, duration_ms: u64) {
        let _ = (bytes, duration_ms);
    }

    /// Called when the model reply has been received and validated.
    ///
    /// `located` is how many of the five fields carry a real bounding box.
    fn on_record_validated(&self, located: usize, duration_ms: u64) {
        let _ = (located, duration_ms);
    }

    /// Called when the annotated copy has been written.
    ///
    /// `drawn` and `skipped` partition the labeled items.
    fn on_annotation_complete(&self, output: &Path, drawn: usize, skipped: usize) {
        let _ = (output, drawn, skipped);
    }

    /// Called once at the end of a successful run.
    fn on_complete(&self, stats: &ExtractionStats) {
        let _ = stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProgress {
        events: AtomicUsize,
    }

    impl ExtractionProgress for CountingProgress {
        fn on_record_validated(&self, _located: usize, _duration_ms: u64) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let p = CountingProgress {
            events: AtomicUsize::new(0),
        };
        p.on_start(Path::new("invoice.pdf"));
        p.on_upload_complete(1024, 10);
        p.on_complete(&ExtractionStats::default());
        assert_eq!(p.events.load(Ordering::SeqCst), 0);

        p.on_record_validated(5, 100);
        assert_eq!(p.events.load(Ordering::SeqCst), 1);
    }
}
