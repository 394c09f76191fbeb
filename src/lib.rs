//! # invoice2json
//!
//! Extract structured fields from an invoice PDF with a hosted multimodal
//! model (Google Gemini), validate the reply against a fixed JSON Schema, and
//! optionally annotate the source document with labeled bounding boxes over
//! the extracted fields.
//!
//! The hard problems (document understanding, OCR, layout analysis) are
//! delegated to the hosted model; PDF drawing is delegated to pdfium. What
//! lives here is the coordination: a typed schema, one upload, one
//! schema-constrained generation request, strict validation, and a
//! coordinate-converted annotation pass.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path and %PDF magic
//!  ├─ 2. Upload    push bytes to the Gemini Files API
//!  ├─ 3. Generate  one generateContent call, schema-constrained output
//!  ├─ 4. Validate  jsonschema + typed deserialisation → InvoiceRecord
//!  └─ 5. Annotate  (optional) labeled boxes onto a copy of the PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .annotate_to("invoice_annotated.pdf")
//!         .build()?;
//!     let output = extract("invoice.pdf", &config).await?;
//!     println!("total: {}", output.invoice.total.value);
//!     println!("recipient: {}", output.invoice.recipient.name);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! invoice2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use error::ExtractError;
pub use extract::{extract, extract_from_bytes, extract_sync};
pub use extractor::{Extractor, GeminiExtractor};
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::annotate::{annotate_pdf, page_rect, Annotator, PageRect, PdfiumAnnotator};
pub use progress::ExtractionProgress;
pub use schema::{
    invoice_schema, parse_invoice, AccountNumberField, BoundingBox, FieldKind, FieldLocation,
    InvoiceRecord, LabeledBox, RecipientField, SenderField, TaxAmountField, TotalAmountField,
};
