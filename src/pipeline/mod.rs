//! Pipeline stages for invoice extraction.
//!
//! Each submodule implements exactly one step, and each step is independently
//! testable without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ upload ──▶ generate ──▶ parse ──▶ annotate (optional)
//! (path)    (Files API) (schema-    (typed     (pdfium, new file)
//!                        constrained) record)
//! ```
//!
//! 1. [`input`]    — validate the caller-supplied path and PDF magic bytes
//! 2. [`upload`]   — push the bytes to the Gemini Files API (two requests,
//!    single attempt)
//! 3. [`generate`] — one generateContent call carrying the file reference,
//!    the prompt, and the schema constraint
//! 4. parsing/validation lives in [`crate::schema`], next to the types it
//!    produces
//! 5. [`annotate`] — coordinate conversion and labeled-box drawing; runs in
//!    `spawn_blocking` because pdfium is not async-safe

pub mod annotate;
pub mod generate;
pub mod input;
pub mod upload;
