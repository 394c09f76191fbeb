//! Error types for the invoice2json library.
//!
//! One fatal error enum covers the whole run: extraction is all-or-nothing,
//! so there is no per-item error type. A field the model could not locate is
//! a data condition (the all-zero box), not an error, and never appears here.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice2json library.
///
/// Every variant terminates the run; nothing is retried and no partial
/// output (record or annotated PDF) is produced.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was supplied. Checked before any file or network access.
    #[error(
        "Gemini API key is not set.\nExport GEMINI_API_KEY or pass the key via ExtractionConfig::builder().api_key(...)."
    )]
    ApiKeyMissing,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Service errors (single attempt, never retried) ────────────────────
    /// The Files API upload failed at the transport level or returned a
    /// non-success status.
    #[error("Upload to the Gemini Files API failed: {reason}")]
    UploadFailed { reason: String },

    /// The generateContent call failed at the transport level or returned a
    /// non-success status.
    #[error("Gemini inference call failed: {reason}")]
    InferenceFailed { reason: String },

    // ── Response validation errors ────────────────────────────────────────
    /// The model reply carried no parseable JSON document.
    #[error("Model response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },

    /// The reply parsed as JSON but does not conform to the invoice schema.
    #[error("Model response does not match the invoice schema:\n{detail}")]
    SchemaViolation { detail: String },

    // ── Annotation errors ─────────────────────────────────────────────────
    /// The source PDF could not be opened for annotation.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A located field references a page outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Could not create or write the annotated output file.
    #[error("Failed to write annotated PDF '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the system library path."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
