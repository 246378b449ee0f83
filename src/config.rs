//! Configuration for a menu extraction run.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to construct stub configurations in tests and to see, in one
//! place, everything that can change between two runs.
//!
//! No pipeline stage reads the environment or any other ambient state — the
//! CLI resolves `API_KEY`, `MODEL_NAME`, `OUTPUT_DIR`, `TEMPERATURE` and
//! `MAX_TOKENS` once at startup and threads the resulting value through every
//! component.

use crate::error::MenuExtractError;
use crate::llm::CompletionBackend;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default chat-completions endpoint (Groq; any OpenAI-compatible server works).
pub const DEFAULT_API_BASE_URL: &str = "https://api.groq.com/openai";

/// Default extraction model.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";

/// Configuration for a menu extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use menu2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("gsk-...")
///     .model("llama-3.3-70b-versatile")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Credential for the completion service. Required unless a pre-built
    /// [`CompletionBackend`] is injected via `backend`.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API. Default: Groq.
    pub api_base_url: String,

    /// Model identifier passed through verbatim to the API and recorded in
    /// the result metadata.
    pub model: String,

    /// Pre-constructed completion backend. Takes precedence over
    /// `api_key`/`api_base_url`; this is the seam tests use to script
    /// deterministic replies without a network.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction is transcription, not creative writing — low temperature
    /// keeps the model faithful to the source values.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Dense multi-page menus can exceed 2 000 output tokens; setting this
    /// too low truncates the JSON mid-object and forces a repair round-trip.
    pub max_tokens: u32,

    /// Maximum attempts for a completion request on transient failure.
    /// Default: 3. Fatal errors (auth, malformed request) are never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per attempt.
    /// Default: 500 (500 ms → 1 s → 2 s).
    pub retry_backoff_ms: u64,

    /// Per-request timeout in seconds for the completion call. Default: 60.
    pub api_timeout_secs: u64,

    /// Tesseract language code for optical extraction. Default: "eng".
    pub ocr_language: String,

    /// Maximum rendered dimension (px) when rasterising PDF pages for OCR.
    /// Default: 2000. Caps memory regardless of page size.
    pub ocr_max_pixels: u32,

    /// Minimum non-whitespace characters for a PDF text layer to count as
    /// usable. Default: 32. Below this, the acquirer falls back to OCR —
    /// a handful of stray glyphs is a scanner artefact, not a menu.
    pub min_text_layer_chars: usize,

    /// Character cap on the extracted text embedded in the user prompt.
    /// Default: 60 000. A token-budget knob, not a correctness requirement.
    pub max_prompt_chars: usize,

    /// Destination directory for the output JSON. Default: the input file's
    /// directory. Created if absent.
    pub output_dir: Option<PathBuf>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            backend: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            ocr_language: "eng".to_string(),
            ocr_max_pixels: 2000,
            min_text_layer_chars: 32,
            max_prompt_chars: 60_000,
            output_dir: None,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_max_pixels", &self.ocr_max_pixels)
            .field("min_text_layer_chars", &self.min_text_layer_chars)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("output_dir", &self.output_dir)
            .field("system_prompt", &self.system_prompt)
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

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_max_pixels(mut self, px: u32) -> Self {
        self.config.ocr_max_pixels = px.max(100);
        self
    }

    pub fn min_text_layer_chars(mut self, n: usize) -> Self {
        self.config.min_text_layer_chars = n;
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, MenuExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(MenuExtractError::InvalidConfig(
                "model id must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(MenuExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_retries == 0 {
            return Err(MenuExtractError::InvalidConfig(
                "max_retries must be ≥ 1 (the first attempt counts)".into(),
            ));
        }
        if c.max_prompt_chars < 256 {
            return Err(MenuExtractError::InvalidConfig(format!(
                "max_prompt_chars must be ≥ 256, got {}",
                c.max_prompt_chars
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.min_text_layer_chars, 32);
        assert_eq!(c.model, DEFAULT_MODEL);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = ExtractionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
        let c = ExtractionConfig::builder().temperature(-1.0).build().unwrap();
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = ExtractionConfig::builder().model("  ").build();
        assert!(matches!(err, Err(MenuExtractError::InvalidConfig(_))));
    }

    #[test]
    fn zero_retries_is_rejected() {
        let err = ExtractionConfig::builder().max_retries(0).build();
        assert!(matches!(err, Err(MenuExtractError::InvalidConfig(_))));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ExtractionConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn debug_shows_system_prompt() {
        let c = ExtractionConfig::builder()
            .system_prompt("custom rules")
            .build()
            .unwrap();
        assert!(format!("{c:?}").contains("custom rules"));
    }
}
