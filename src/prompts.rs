//! Instruction prompts for invoice extraction.
//!
//! The prompt only has to say *what* to extract; the structural guarantees
//! come from the JSON Schema attached to the request as an output constraint,
//! not from prompt wording. Callers can override the default via
//! [`crate::config::ExtractionConfig::prompt`].

/// Default instruction prompt sent alongside the uploaded document.
///
/// Used when `ExtractionConfig::prompt` is `None`.
pub const DEFAULT_PROMPT: &str = "\
Extract the following fields from the attached invoice: the invoice total, \
the tax amount, the recipient name, the sender name, and the account number.

For every field, report the bounding box where the information was found as \
[y_min, x_min, y_max, x_max] normalized to a 0-1000 scale, and the 1-based \
page number. If a field cannot be located, use [0, 0, 0, 0] as its bounding \
box.

Return only JSON that matches the provided schema.";
