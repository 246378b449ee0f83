//! End-to-end tests for the prompt → completion → normalize core, driven by a
//! scripted completion backend so no network, pdfium, or tesseract is needed.

use async_trait::async_trait;
use menu2json::llm::{CompletionBackend, CompletionRequest, LlmFailure, RawCompletion};
use menu2json::{extract_from_text, ExtractedText, ExtractionConfig, MenuExtractError, TextSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MENU_TEXT: &str = "\
CAFE UNO

South Indian
MASALA DOSA  ₹60
IDLI (2 pcs)  ₹40

Beverages
FILTER COFFEE  ₹25
";

const VALID_REPLY: &str = r#"{"restaurant_name": "CAFE UNO", "items": [
    {"name": "MASALA DOSA", "description": null, "price": "₹60", "category": "South Indian"},
    {"name": "IDLI (2 pcs)", "description": null, "price": "₹40", "category": "South Indian"},
    {"name": "FILTER COFFEE", "description": null, "price": "₹25", "category": "Beverages"}
]}"#;

// ₹999 appears nowhere in the menu, so validation must reject this reply.
const HALLUCINATED_REPLY: &str = r#"{"restaurant_name": "CAFE UNO", "items": [
    {"name": "MASALA DOSA", "price": "₹999", "category": "South Indian"}
]}"#;

/// Scripted backend: pops one canned reply per call and records every request.
struct StubBackend {
    script: Mutex<VecDeque<Result<RawCompletion, LlmFailure>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubBackend {
    fn new(replies: Vec<Result<RawCompletion, LlmFailure>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn scripted(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| ok(r)).collect())
    }

    fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, idx: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[idx].clone()
    }
}

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, LlmFailure> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmFailure::fatal("script exhausted")))
    }
}

fn ok(text: &str) -> Result<RawCompletion, LlmFailure> {
    Ok(RawCompletion {
        text: text.to_string(),
        finish_reason: Some("stop".to_string()),
    })
}

fn menu_text() -> ExtractedText {
    ExtractedText {
        pages: vec![MENU_TEXT.to_string()],
        source: TextSource::Native,
    }
}

fn config_with(backend: Arc<StubBackend>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .backend(backend)
        .temperature(0.0)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

#[tokio::test]
async fn valid_first_reply_needs_exactly_one_call() {
    let backend = StubBackend::scripted(&[VALID_REPLY]);
    let config = config_with(Arc::clone(&backend));

    let doc = extract_from_text(&menu_text(), &config).await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(doc.restaurant_name.as_deref(), Some("CAFE UNO"));
    assert_eq!(doc.items.len(), 3);
    assert_eq!(doc.items[0].name, "MASALA DOSA");
    assert_eq!(doc.items[0].price.as_deref(), Some("₹60"));
    assert_eq!(doc.items[0].category.as_deref(), Some("South Indian"));
    assert_eq!(doc.items[2].category.as_deref(), Some("Beverages"));
}

#[tokio::test]
async fn invalid_first_reply_triggers_one_repair() {
    let backend = StubBackend::scripted(&[HALLUCINATED_REPLY, VALID_REPLY]);
    let config = config_with(Arc::clone(&backend));

    let doc = extract_from_text(&menu_text(), &config).await.unwrap();

    assert_eq!(backend.call_count(), 2, "exactly one repair re-prompt");
    assert_eq!(doc.items.len(), 3);

    // The repair request keeps the user prompt verbatim but extends the
    // system prompt with the correction instruction.
    let first = backend.request(0);
    let repair = backend.request(1);
    assert_eq!(first.messages[1].content, repair.messages[1].content);
    assert!(repair.messages[0].content.len() > first.messages[0].content.len());
    assert!(repair.messages[0].content.starts_with(&first.messages[0].content));
}

#[tokio::test]
async fn two_invalid_replies_fail_with_raw_attached() {
    let backend = StubBackend::scripted(&[HALLUCINATED_REPLY, "not json at all"]);
    let config = config_with(Arc::clone(&backend));

    let err = extract_from_text(&menu_text(), &config).await.unwrap_err();

    assert_eq!(backend.call_count(), 2, "no third attempt");
    match err {
        MenuExtractError::ResponseParse { raw, .. } => {
            assert_eq!(raw, "not json at all");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn schema_failure_on_repair_surfaces_as_schema_error() {
    let backend = StubBackend::scripted(&[HALLUCINATED_REPLY, HALLUCINATED_REPLY]);
    let config = config_with(Arc::clone(&backend));

    let err = extract_from_text(&menu_text(), &config).await.unwrap_err();

    match err {
        MenuExtractError::SchemaValidation { detail, .. } => {
            assert!(detail.contains("₹999"), "got: {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_text_never_reaches_the_backend() {
    let backend = StubBackend::scripted(&[VALID_REPLY]);
    let config = config_with(Arc::clone(&backend));
    let empty = ExtractedText {
        pages: vec!["   ".to_string(), "".to_string()],
        source: TextSource::Ocr,
    };

    let err = extract_from_text(&empty, &config).await.unwrap_err();

    assert_eq!(backend.call_count(), 0);
    assert!(matches!(err, MenuExtractError::EmptyText { .. }));
}

#[tokio::test]
async fn transient_backend_failure_is_retried_transparently() {
    let backend = StubBackend::new(vec![
        Err(LlmFailure::transient("HTTP 503")),
        ok(VALID_REPLY),
    ]);
    let config = config_with(Arc::clone(&backend));

    let doc = extract_from_text(&menu_text(), &config).await.unwrap();

    assert_eq!(backend.call_count(), 2);
    assert_eq!(doc.items.len(), 3);
}

#[tokio::test]
async fn fatal_backend_failure_aborts_the_run() {
    let backend = StubBackend::new(vec![Err(LlmFailure::fatal("HTTP 401"))]);
    let config = config_with(Arc::clone(&backend));

    let err = extract_from_text(&menu_text(), &config).await.unwrap_err();

    assert_eq!(backend.call_count(), 1);
    assert!(matches!(err, MenuExtractError::LlmRequest { attempts: 1, .. }));
}

#[tokio::test]
async fn identical_runs_produce_identical_documents() {
    let text = menu_text();

    let backend_a = StubBackend::scripted(&[VALID_REPLY]);
    let doc_a = extract_from_text(&text, &config_with(Arc::clone(&backend_a)))
        .await
        .unwrap();

    let backend_b = StubBackend::scripted(&[VALID_REPLY]);
    let doc_b = extract_from_text(&text, &config_with(Arc::clone(&backend_b)))
        .await
        .unwrap();

    assert_eq!(doc_a, doc_b);
    // The wire requests are byte-identical too.
    assert_eq!(
        serde_json::to_string(&backend_a.request(0)).unwrap(),
        serde_json::to_string(&backend_b.request(0)).unwrap()
    );
}

#[tokio::test]
async fn fenced_reply_is_equivalent_to_bare_json() {
    let fenced = format!("```json\n{VALID_REPLY}\n```");
    let backend_fenced = StubBackend::scripted(&[fenced.as_str()]);
    let backend_bare = StubBackend::scripted(&[VALID_REPLY]);

    let from_fenced = extract_from_text(&menu_text(), &config_with(Arc::clone(&backend_fenced)))
        .await
        .unwrap();
    let from_bare = extract_from_text(&menu_text(), &config_with(Arc::clone(&backend_bare)))
        .await
        .unwrap();

    assert_eq!(from_fenced, from_bare);
}
