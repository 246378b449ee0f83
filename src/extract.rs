//! Extraction entry points: the full pipeline plus the atomic result write.
//!
//! The pipeline is strictly sequential — each stage blocks on the prior
//! stage's value and failures short-circuit:
//!
//! ```text
//! detect ─▶ acquire ─▶ prompt ─▶ completion ─▶ normalize ─▶ assemble/write
//! ```
//!
//! [`extract_from_text`] exposes the prompt → completion → normalize core on
//! its own, both for callers that already hold text and so the repair loop
//! can be exercised against a scripted backend without touching pdfium or
//! tesseract.

use crate::config::ExtractionConfig;
use crate::document::{ExtractedText, ExtractionResult, MenuDocument, RunMetadata};
use crate::error::MenuExtractError;
use crate::llm::{
    send_with_retry, ChatMessage, CompletionBackend, CompletionRequest, OpenAiCompatibleBackend,
    RetryPolicy,
};
use crate::pipeline::normalize::{parse_and_validate, NormalizeIssue};
use crate::pipeline::{acquire, detect};
use crate::prompts::{build_user_prompt, DEFAULT_SYSTEM_PROMPT, REPAIR_INSTRUCTION};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run the whole pipeline on one menu document.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any stage failure propagates as the matching [`MenuExtractError`] variant;
/// no stage substitutes a default for a failed result.
pub async fn extract(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, MenuExtractError> {
    let started = Instant::now();
    let input = input.as_ref();
    info!("starting extraction: {}", input.display());

    let source = detect::detect(input)?;
    let text = acquire::acquire_text(&source, config).await?;
    info!(
        "acquired {} page(s) of text via {:?}",
        text.page_count(),
        text.source
    );

    let data = extract_from_text(&text, config).await?;

    let metadata = RunMetadata {
        filename: input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string()),
        total_pages: text.page_count(),
        processing_date: Utc::now().to_rfc3339(),
        model_used: config.model.clone(),
        file_type: source.file_type,
    };

    info!(
        "extraction complete: {} item(s) in {}ms",
        data.items.len(),
        started.elapsed().as_millis()
    );

    Ok(ExtractionResult { metadata, data })
}

/// Run the prompt → completion → normalize core on already-acquired text.
///
/// Performs exactly one repair re-prompt when the first reply fails to parse
/// or validate; a second failure surfaces the normalization error with the
/// offending raw reply attached.
pub async fn extract_from_text(
    text: &ExtractedText,
    config: &ExtractionConfig,
) -> Result<MenuDocument, MenuExtractError> {
    if text.is_empty() {
        return Err(MenuExtractError::EmptyText {
            path: PathBuf::from("(in-memory text)"),
        });
    }

    let backend = resolve_backend(config)?;
    let policy = RetryPolicy {
        max_attempts: config.max_retries,
        backoff_ms: config.retry_backoff_ms,
    };

    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let user_prompt = build_user_prompt(text, config.max_prompt_chars);

    // Each attempt gets a freshly built, immutable request.
    let request = completion_request(config, system_prompt.to_string(), user_prompt.clone());
    let first = send_with_retry(backend.as_ref(), &request, &policy).await?;

    match parse_and_validate(&first.text, text) {
        Ok(document) => Ok(document),
        Err(issue) => {
            warn!(
                "first reply failed normalization ({}), issuing repair re-prompt",
                issue.detail()
            );
            let repair_request = completion_request(
                config,
                format!("{system_prompt}{REPAIR_INSTRUCTION}"),
                user_prompt,
            );
            let second = send_with_retry(backend.as_ref(), &repair_request, &policy).await?;

            parse_and_validate(&second.text, text)
                .map_err(|issue| issue_to_error(issue, second.text))
        }
    }
}

/// Run the pipeline and atomically persist the result as pretty JSON.
///
/// Write discipline: serialize to `<output>.tmp` in the destination
/// directory, then rename over the final path. An interrupt or crash
/// mid-write never leaves a corrupt or partial file where a prior good
/// output may have been.
pub async fn extract_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, MenuExtractError> {
    let result = extract(input, config).await?;
    write_result_atomic(&result, output_path.as_ref())?;
    Ok(result)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, MenuExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MenuExtractError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(extract(input, config))
}

/// Default output location: `<stem>_extracted.json` in the configured output
/// directory, or next to the input file when none is configured.
pub fn default_output_path(input: &Path, config: &ExtractionConfig) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "menu".to_string());
    let dir = config
        .output_dir
        .clone()
        .or_else(|| input.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{stem}_extracted.json"))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the injected backend when present, otherwise build the production
/// OpenAI-compatible client from the configured credential.
fn resolve_backend(
    config: &ExtractionConfig,
) -> Result<Arc<dyn CompletionBackend>, MenuExtractError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let api_key = config.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
        MenuExtractError::InvalidConfig(
            "no API key configured — set API_KEY or inject a backend".to_string(),
        )
    })?;

    Ok(Arc::new(OpenAiCompatibleBackend::new(
        api_key,
        config.api_base_url.clone(),
        config.api_timeout_secs,
    )?))
}

fn completion_request(
    config: &ExtractionConfig,
    system_prompt: String,
    user_prompt: String,
) -> CompletionRequest {
    CompletionRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        messages: vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_prompt),
        ],
    }
}

fn issue_to_error(issue: NormalizeIssue, raw: String) -> MenuExtractError {
    match issue {
        NormalizeIssue::Parse(detail) => MenuExtractError::ResponseParse { detail, raw },
        NormalizeIssue::Schema(detail) => MenuExtractError::SchemaValidation { detail, raw },
    }
}

/// Serialize and write the result with the temp-file-then-rename discipline.
fn write_result_atomic(
    result: &ExtractionResult,
    path: &Path,
) -> Result<(), MenuExtractError> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| MenuExtractError::Internal(format!("serialize result: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MenuExtractError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json).map_err(|e| MenuExtractError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| MenuExtractError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("wrote result to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FileType, MenuItem};

    fn sample_result() -> ExtractionResult {
        ExtractionResult {
            metadata: RunMetadata {
                filename: "menu.pdf".into(),
                total_pages: 1,
                processing_date: Utc::now().to_rfc3339(),
                model_used: "test-model".into(),
                file_type: FileType::Pdf,
            },
            data: MenuDocument {
                restaurant_name: Some("CAFE UNO".into()),
                items: vec![MenuItem {
                    name: "MASALA DOSA".into(),
                    description: None,
                    price: Some("₹60".into()),
                    category: Some("South Indian".into()),
                }],
            },
        }
    }

    #[test]
    fn atomic_write_produces_final_file_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("menu_extracted.json");

        write_result_atomic(&sample_result(), &out).unwrap();

        assert!(out.exists());
        assert!(!out.with_extension("json.tmp").exists(), "temp file must be gone");

        let round_trip: ExtractionResult =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(round_trip.data.items[0].price.as_deref(), Some("₹60"));
    }

    #[test]
    fn atomic_write_replaces_prior_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("menu_extracted.json");
        std::fs::write(&out, "old contents").unwrap();

        write_result_atomic(&sample_result(), &out).unwrap();

        let contents = std::fs::read_to_string(&out).unwrap();
        assert!(contents.contains("CAFE UNO"));
        assert!(!contents.contains("old contents"));
    }

    #[test]
    fn atomic_write_creates_missing_output_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("nested/output/menu_extracted.json");
        write_result_atomic(&sample_result(), &out).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn default_output_path_uses_stem_and_config_dir() {
        let config = ExtractionConfig::builder()
            .output_dir("/data/out")
            .build()
            .unwrap();
        assert_eq!(
            default_output_path(Path::new("/menus/dinner.pdf"), &config),
            PathBuf::from("/data/out/dinner_extracted.json")
        );

        let config = ExtractionConfig::default();
        assert_eq!(
            default_output_path(Path::new("/menus/dinner.pdf"), &config),
            PathBuf::from("/menus/dinner_extracted.json")
        );
    }
}
