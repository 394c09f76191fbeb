//! Structured generation: one generateContent call against the uploaded file.
//!
//! The request carries the uploaded-file reference, the instruction prompt,
//! and the invoice schema as `generationConfig.responseJsonSchema`, so the
//! service rather than local code is responsible for emitting conforming JSON.
//! Local validation of the reply lives in [`crate::schema::parse_invoice`].

use crate::error::ExtractError;
use crate::pipeline::upload::UploadedFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ── Request wire types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    file_uri: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_json_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// ── Response wire types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

// ── The call ─────────────────────────────────────────────────────────────

/// Issue one schema-constrained generateContent request and return the raw
/// JSON text of the first candidate.
pub async fn generate_invoice_json(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    file: &UploadedFile,
    prompt: &str,
    schema: &Value,
    temperature: Option<f32>,
) -> Result<String, ExtractError> {
    let request = GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    file_data: Some(FileData {
                        file_uri: &file.uri,
                        mime_type: &file.mime_type,
                    }),
                    text: None,
                },
                Part {
                    file_data: None,
                    text: Some(prompt),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_json_schema: schema,
            temperature,
        },
    };

    let url = format!("{api_base}/v1beta/models/{model}:generateContent");
    let response = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| ExtractError::InferenceFailed {
            reason: if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ExtractError::InferenceFailed {
            reason: format!("HTTP {status}: {body}"),
        });
    }

    let envelope =
        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ExtractError::InferenceFailed {
                reason: format!("unreadable response envelope: {e}"),
            })?;

    if let Some(usage) = &envelope.usage_metadata {
        debug!(
            "Inference usage: {} prompt tokens, {} output tokens",
            usage.prompt_token_count.unwrap_or(0),
            usage.candidates_token_count.unwrap_or(0)
        );
    }

    candidate_text(&envelope).ok_or_else(|| ExtractError::MalformedResponse {
        detail: match envelope.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason) => format!("response contained no candidate text (finish reason: {reason})"),
            None => "response contained no candidates".to_string(),
        },
    })
}

/// Concatenate the text parts of the first candidate, if any.
fn candidate_text(envelope: &GenerateResponse) -> Option<String> {
    let content = envelope.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
