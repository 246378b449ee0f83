//! The completion client: request types, the backend trait, and retry.
//!
//! [`CompletionBackend`] is the seam between the pipeline and the network.
//! Production uses [`OpenAiCompatibleBackend`] (any OpenAI-compatible
//! chat-completions server; the default config points at Groq). Tests inject
//! a scripted stub through [`crate::config::ExtractionConfig::backend`].
//!
//! ## Retry strategy
//!
//! HTTP 429/5xx and network blips are transient and frequent. Exponential
//! backoff (`backoff_ms`, doubling per retry) avoids hammering a recovering
//! endpoint:
//! with the 500 ms default and 3 attempts the wait sequence is 500 ms → 1 s.
//! Fatal failures — bad credentials, malformed requests — are never retried;
//! they surface immediately with the attempt count spent so far.

use crate::error::{LlmErrorKind, MenuExtractError};
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Chat message role. Extraction only ever sends system + user turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An immutable completion request, built fresh per attempt.
///
/// Repair re-prompts construct a new value rather than mutating a prior one,
/// so two requests from the same source text with the same settings are
/// byte-identical — the property that makes temperature-0 runs reproducible.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

/// The unparsed model reply.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// A single failed completion attempt, classified for the retry policy.
#[derive(Debug, Clone)]
pub struct LlmFailure {
    pub kind: LlmErrorKind,
    pub detail: String,
}

impl LlmFailure {
    pub fn transient(detail: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Transient,
            detail: detail.into(),
        }
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Fatal,
            detail: detail.into(),
        }
    }
}

/// A backend that can answer one completion request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, LlmFailure>;
}

/// Production backend: POSTs to `{base}/v1/chat/completions` with a bearer
/// token, like every OpenAI-compatible server (Groq, OpenAI, vLLM, Ollama).
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, MenuExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MenuExtractError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, LlmFailure> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("completion request to {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    LlmFailure::transient(format!("network error: {e}"))
                } else {
                    LlmFailure::fatal(format!("request error: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {status}: {body}");
            return Err(if classify_status(status.as_u16()) == LlmErrorKind::Transient {
                LlmFailure::transient(detail)
            } else {
                LlmFailure::fatal(detail)
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmFailure::fatal(format!("response body: {e}")))?;

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmFailure::fatal("missing choices[0].message.content".to_string()))?
            .to_string();
        let finish_reason = body["choices"][0]["finish_reason"]
            .as_str()
            .map(|s| s.to_string());

        Ok(RawCompletion {
            text,
            finish_reason,
        })
    }
}

/// Status classification: retry rate limiting, request timeouts, and
/// server-side failures; give up on everything else.
fn classify_status(status: u16) -> LlmErrorKind {
    match status {
        429 | 408 => LlmErrorKind::Transient,
        500..=599 => LlmErrorKind::Transient,
        _ => LlmErrorKind::Fatal,
    }
}

/// Bounded retry with exponential backoff.
///
/// A value rather than hard-coded constants so retry behaviour is
/// unit-testable without a network.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be ≥ 1.
    pub max_attempts: u32,
    /// Initial backoff, doubling per retry.
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        // attempt is 1-based; no wait before the first attempt. Saturate so
        // an absurd attempt budget caps the wait instead of overflowing.
        let factor = 2u64.saturating_pow(attempt.saturating_sub(2));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Drive a completion request through the backend under the retry policy.
///
/// Transient failures are retried until the attempt budget is spent; a fatal
/// failure aborts immediately. Either way the returned error records how many
/// attempts were actually made.
pub async fn send_with_retry(
    backend: &dyn CompletionBackend,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<RawCompletion, MenuExtractError> {
    let mut last: Option<LlmFailure> = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        if attempt > 1 {
            let backoff = policy.backoff_before(attempt);
            warn!(
                "completion retry {}/{} after {:?}",
                attempt, policy.max_attempts, backoff
            );
            sleep(backoff).await;
        }

        match backend.complete(request).await {
            Ok(completion) => {
                debug!(
                    "completion ok on attempt {} ({} chars, finish_reason {:?})",
                    attempt,
                    completion.text.len(),
                    completion.finish_reason
                );
                return Ok(completion);
            }
            Err(failure) => {
                warn!("completion attempt {} failed: {}", attempt, failure.detail);
                if failure.kind == LlmErrorKind::Fatal {
                    return Err(MenuExtractError::LlmRequest {
                        kind: failure.kind,
                        attempts: attempt,
                        detail: failure.detail,
                    });
                }
                last = Some(failure);
            }
        }
    }

    let f = last.unwrap_or_else(|| LlmFailure::transient("no attempts made"));
    Err(MenuExtractError::LlmRequest {
        kind: f.kind,
        attempts: policy.max_attempts.max(1),
        detail: f.detail,
    })
}
