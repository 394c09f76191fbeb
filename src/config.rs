//! Configuration for an extraction run.
//!
//! Everything the pipeline needs is threaded through [`ExtractionConfig`],
//! built via [`ExtractionConfigBuilder`]. The credential lives here too: the
//! library never reads process environment variables itself, so tests can
//! inject a fake key (or a whole fake [`Extractor`]) without touching the
//! environment.

use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::pipeline::annotate::Annotator;
use crate::progress::ExtractionProgress;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Gemini API endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default model identifier, as used by the hosted service.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for a single invoice extraction.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("AIza...")
///     .model("gemini-3-flash-preview")
///     .annotate_to("out/invoice_annotated.pdf")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Gemini API key. Required unless a pre-built [`Extractor`] is injected.
    pub api_key: Option<String>,

    /// Base URL of the Gemini API. Overridable so tests can point the client
    /// at a local stub server.
    pub api_base: String,

    /// Model identifier passed to the hosted service.
    pub model: String,

    /// Instruction prompt. `None` uses [`crate::prompts::DEFAULT_PROMPT`].
    pub prompt: Option<String>,

    /// When set, annotation runs after extraction and writes the labeled
    /// copy of the source PDF to this path. `None` skips annotation.
    pub annotate_to: Option<PathBuf>,

    /// Sampling temperature. `None` leaves the provider default in place.
    /// Low values keep structured extraction deterministic.
    pub temperature: Option<f32>,

    /// Timeout for the Files API upload, in seconds. Default: 120.
    pub upload_timeout_secs: u64,

    /// Timeout for the generateContent call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Pre-built extraction client. Takes precedence over `api_key`; used by
    /// tests to substitute a deterministic fake.
    pub extractor: Option<Arc<dyn Extractor>>,

    /// Pre-built annotation renderer. Used by tests to avoid pdfium.
    pub annotator: Option<Arc<dyn Annotator>>,

    /// Progress event sink. `None` means silent.
    pub progress: Option<Arc<dyn ExtractionProgress>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: None,
            annotate_to: None,
            temperature: None,
            upload_timeout_secs: 120,
            api_timeout_secs: 60,
            extractor: None,
            annotator: None,
            progress: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("annotate_to", &self.annotate_to)
            .field("temperature", &self.temperature)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn Extractor>"))
            .field("annotator", &self.annotator.as_ref().map(|_| "<dyn Annotator>"))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn annotate_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.annotate_to = Some(path.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn annotator(mut self, annotator: Arc<dyn Annotator>) -> Self {
        self.config.annotator = Some(annotator);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ExtractionProgress>) -> Self {
        self.config.progress = Some(progress);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "model name must not be empty".into(),
            ));
        }
        if c.api_base.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ExtractError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        Ok(self.config)
    }
}
