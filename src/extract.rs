//! Top-level extraction entry points.
//!
//! [`extract`] runs the whole flow for one document: credential check,
//! input resolution, upload + inference + validation, and optionally
//! annotation. Annotation is a configuration toggle
//! ([`ExtractionConfig::annotate_to`]), not a separate entry point.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::extractor::{Extractor, GeminiExtractor};
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::annotate::{self, Annotator, PdfiumAnnotator};
use crate::pipeline::input;
use crate::prompts::DEFAULT_PROMPT;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract the invoice fields from a PDF file.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`  — path to a local PDF file
/// * `config` — extraction configuration
///
/// # Errors
/// Every failure is fatal for the run: missing credential, unreadable input,
/// a failed upload or inference call (single attempt each), a non-conforming
/// model reply, or an annotation failure. No partial output is produced.
pub async fn extract(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();

    // ── Step 1: Credential check / client construction ───────────────────
    // Deliberately first: a missing API key must abort before any file or
    // network access.
    let extractor = resolve_extractor(config)?;

    // ── Step 2: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_local(input.as_ref())?;
    info!("Starting extraction: {}", pdf_path.display());
    if let Some(ref progress) = config.progress {
        progress.on_start(&pdf_path);
    }

    // ── Step 3: Upload + inference + validation ──────────────────────────
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    let extraction_start = Instant::now();
    let invoice = extractor
        .extract(&pdf_path, prompt, &config.model)
        .await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 4: Annotation (configuration toggle) ────────────────────────
    let mut annotation_duration_ms = 0;
    let annotated = match &config.annotate_to {
        Some(output_path) => {
            let items = invoice.labeled_boxes();
            let drawn = items.iter().filter(|i| annotate::is_drawable(i)).count();
            let skipped = items.len() - drawn;
            debug!(
                "Annotating {} items ({} drawable) into {}",
                items.len(),
                drawn,
                output_path.display()
            );

            let annotation_start = Instant::now();
            let annotator = resolve_annotator(config);
            annotate::annotate_pdf(
                annotator,
                pdf_path.clone(),
                output_path.clone(),
                items,
            )
            .await?;
            annotation_duration_ms = annotation_start.elapsed().as_millis() as u64;

            if let Some(ref progress) = config.progress {
                progress.on_annotation_complete(output_path, drawn, skipped);
            }
            Some(output_path.clone())
        }
        None => None,
    };

    // ── Step 5: Assemble output ──────────────────────────────────────────
    let stats = ExtractionStats {
        extraction_duration_ms,
        annotation_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        located_fields: invoice.located_count(),
    };
    info!(
        "Extraction complete: {}/5 fields located, {}ms total",
        stats.located_fields, stats.total_duration_ms
    );
    if let Some(ref progress) = config.progress {
        progress.on_complete(&stats);
    }

    Ok(ExtractionOutput {
        invoice,
        stats,
        annotated,
    })
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(input, config))
}

/// Extract from PDF bytes in memory.
///
/// Writes `bytes` to a managed tempfile and runs [`extract`] on it; the
/// tempfile is removed on return or panic. Recommended when the PDF comes
/// from a database or network stream rather than a file on disk.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(tmp.path().to_path_buf(), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the injected extractor when present, otherwise build the Gemini
/// client, which performs the eager credential check.
fn resolve_extractor(config: &ExtractionConfig) -> Result<Arc<dyn Extractor>, ExtractError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    Ok(Arc::new(GeminiExtractor::new(config)?))
}

fn resolve_annotator(config: &ExtractionConfig) -> Arc<dyn Annotator> {
    match config.annotator {
        Some(ref annotator) => Arc::clone(annotator),
        None => Arc::new(PdfiumAnnotator),
    }
}
