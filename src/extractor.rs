//! The extraction-client seam and its Gemini implementation.
//!
//! [`Extractor`] is the narrow interface orchestration talks to; tests
//! substitute a deterministic fake. [`GeminiExtractor`] is the production
//! implementation: upload the document, issue one schema-constrained
//! generation request, validate the reply. No algorithmic work happens here;
//! structural correctness of the result is the remote side's obligation,
//! enforced locally by [`crate::schema::parse_invoice`].

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::{generate, upload};
use crate::progress::ExtractionProgress;
use crate::schema::{self, InvoiceRecord};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Extracts a validated [`InvoiceRecord`] from a PDF.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Run one extraction against `pdf_path` with the given instruction
    /// prompt and model identifier.
    async fn extract(
        &self,
        pdf_path: &Path,
        prompt: &str,
        model: &str,
    ) -> Result<InvoiceRecord, ExtractError>;
}

/// Production [`Extractor`] backed by the Gemini REST API.
pub struct GeminiExtractor {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    temperature: Option<f32>,
    upload_timeout: Duration,
    api_timeout: Duration,
    progress: Option<Arc<dyn ExtractionProgress>>,
}

impl std::fmt::Debug for GeminiExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiExtractor")
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("upload_timeout", &self.upload_timeout)
            .field("api_timeout", &self.api_timeout)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl GeminiExtractor {
    /// Build a client from the configuration.
    ///
    /// The credential check happens here, eagerly: a missing or empty API key
    /// fails before any file read or network call, and before the HTTP client
    /// exists.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let api_key = match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            _ => return Err(ExtractError::ApiKeyMissing),
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            temperature: config.temperature,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
            api_timeout: Duration::from_secs(config.api_timeout_secs),
            progress: config.progress.clone(),
        })
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(
        &self,
        pdf_path: &Path,
        prompt: &str,
        model: &str,
    ) -> Result<InvoiceRecord, ExtractError> {
        // ── Upload ───────────────────────────────────────────────────────
        let upload_start = Instant::now();
        let uploaded = tokio::time::timeout(
            self.upload_timeout,
            upload::upload_pdf(&self.http, &self.api_base, &self.api_key, pdf_path),
        )
        .await
        .map_err(|_| ExtractError::UploadFailed {
            reason: format!("timed out after {}s", self.upload_timeout.as_secs()),
        })??;

        if let Some(ref progress) = self.progress {
            let bytes = std::fs::metadata(pdf_path).map(|m| m.len()).unwrap_or(0);
            progress.on_upload_complete(bytes, upload_start.elapsed().as_millis() as u64);
        }

        // ── Inference ────────────────────────────────────────────────────
        let inference_start = Instant::now();
        let schema_json = schema::invoice_schema();
        let text = tokio::time::timeout(
            self.api_timeout,
            generate::generate_invoice_json(
                &self.http,
                &self.api_base,
                &self.api_key,
                model,
                &uploaded,
                prompt,
                &schema_json,
                self.temperature,
            ),
        )
        .await
        .map_err(|_| ExtractError::InferenceFailed {
            reason: format!("timed out after {}s", self.api_timeout.as_secs()),
        })??;

        // ── Validate ─────────────────────────────────────────────────────
        let record = schema::parse_invoice(&text)?;
        info!(
            "Extraction validated: {}/5 fields located",
            record.located_count()
        );

        if let Some(ref progress) = self.progress {
            progress.on_record_validated(
                record.located_count(),
                inference_start.elapsed().as_millis() as u64,
            );
        }

        Ok(record)
    }
}
