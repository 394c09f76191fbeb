//! Output types for an extraction run.

use crate::schema::InvoiceRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The result of a completed extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The validated invoice record.
    pub invoice: InvoiceRecord,

    /// Timing and location statistics for the run.
    pub stats: ExtractionStats,

    /// Where the annotated copy was written, when annotation was enabled.
    pub annotated: Option<PathBuf>,
}

/// Wall-clock and coverage statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Milliseconds spent in the extraction client (upload, inference, and
    /// response validation).
    pub extraction_duration_ms: u64,

    /// Milliseconds spent drawing and saving the annotated copy. Zero when
    /// annotation was disabled.
    pub annotation_duration_ms: u64,

    /// Total wall-clock milliseconds for the run.
    pub total_duration_ms: u64,

    /// How many of the five fields the model located on the page.
    pub located_fields: usize,
}
