//! Files API upload: push the PDF bytes to the hosted service.
//!
//! Uses the resumable upload protocol in its two-request form: one `start`
//! call that opens an upload session and returns the session URL, then one
//! call that sends the bytes and finalizes. Single attempt: a transport
//! failure or non-success status fails the run.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const PDF_MIME: &str = "application/pdf";

/// A handle to a document uploaded to the Gemini Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Server-side resource name, e.g. `files/abc123`.
    pub name: String,

    /// URI referenced from generateContent requests.
    pub uri: String,

    /// MIME type as recorded by the service.
    pub mime_type: String,

    /// Processing state reported at upload time (`ACTIVE`, `PROCESSING`, …).
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadStartFile<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadStartFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

/// Derive the display name the service shows for this upload.
pub(crate) fn display_name(pdf_path: &Path) -> &str {
    pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice")
}

/// Upload `pdf_path` to the Files API and return the uploaded-file handle.
pub async fn upload_pdf(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    pdf_path: &Path,
) -> Result<UploadedFile, ExtractError> {
    let bytes = tokio::fs::read(pdf_path)
        .await
        .map_err(|e| ExtractError::UploadFailed {
            reason: format!("reading '{}': {e}", pdf_path.display()),
        })?;
    let content_length = bytes.len();

    // Open the upload session.
    let start_url = format!("{api_base}/upload/v1beta/files");
    let start = http
        .post(&start_url)
        .header("x-goog-api-key", api_key)
        .header("X-Goog-Upload-Protocol", "resumable")
        .header("X-Goog-Upload-Command", "start")
        .header("X-Goog-Upload-Header-Content-Length", content_length)
        .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
        .json(&UploadStart {
            file: UploadStartFile {
                display_name: display_name(pdf_path),
            },
        })
        .send()
        .await
        .map_err(|e| ExtractError::UploadFailed {
            reason: transport_reason(&e),
        })?;

    if !start.status().is_success() {
        let status = start.status();
        let body = start.text().await.unwrap_or_default();
        return Err(ExtractError::UploadFailed {
            reason: format!("HTTP {status} starting upload session: {body}"),
        });
    }

    let session_url = start
        .headers()
        .get("x-goog-upload-url")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ExtractError::UploadFailed {
            reason: "service did not return an upload session URL".into(),
        })?;
    debug!("Upload session opened for {} bytes", content_length);

    // Send the bytes and finalize in one shot.
    let finalize = http
        .post(&session_url)
        .header("X-Goog-Upload-Offset", "0")
        .header("X-Goog-Upload-Command", "upload, finalize")
        .body(bytes)
        .send()
        .await
        .map_err(|e| ExtractError::UploadFailed {
            reason: transport_reason(&e),
        })?;

    if !finalize.status().is_success() {
        let status = finalize.status();
        let body = finalize.text().await.unwrap_or_default();
        return Err(ExtractError::UploadFailed {
            reason: format!("HTTP {status} finalizing upload: {body}"),
        });
    }

    let uploaded = finalize
        .json::<UploadResponse>()
        .await
        .map_err(|e| ExtractError::UploadFailed {
            reason: format!("unreadable upload response: {e}"),
        })?
        .file;

    info!(
        "Uploaded {} ({} bytes) as {}",
        pdf_path.display(),
        content_length,
        uploaded.name
    );
    Ok(uploaded)
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    }
}
