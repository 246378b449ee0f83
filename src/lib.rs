//! # menu2json
//!
//! Convert a restaurant-menu document (PDF or photographed/scanned image)
//! into structured, validated JSON using an LLM.
//!
//! ## Why this crate?
//!
//! Menu layouts defeat naive scraping — multi-column sections, decorative
//! fonts, photographed print-outs. This crate acquires raw text the cheap way
//! when it can (a PDF's embedded text layer) and the robust way when it must
//! (tesseract OCR of rasterised pages), then lets an LLM do the layout
//! understanding while a validation pass keeps it honest: a price or category
//! that does not literally appear in the source text is rejected, never
//! persisted.
//!
//! ## Pipeline Overview
//!
//! ```text
//! menu.pdf / menu.jpg
//!  │
//!  ├─ 1. Detect     extension + magic bytes → pdf / jpeg / png
//!  ├─ 2. Acquire    native PDF text layer, OCR fallback (pdfium + tesseract)
//!  ├─ 3. Prompt     schema + anti-hallucination rules + raw text
//!  ├─ 4. Complete   OpenAI-compatible API, bounded retry with backoff
//!  ├─ 5. Normalize  fence-strip, balanced-JSON scan, schema + provenance
//!  │                validation, one repair re-prompt on failure
//!  └─ 6. Assemble   run metadata + validated data, atomic JSON write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use menu2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("API_KEY")?)
//!         .build()?;
//!     let result = extract("menu.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `menu2json` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! menu2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use document::{
    ExtractedText, ExtractionResult, FileType, MenuDocument, MenuItem, RunMetadata,
    SourceDocument, TextSource,
};
pub use error::{LlmErrorKind, MenuExtractError};
pub use extract::{
    default_output_path, extract, extract_from_text, extract_sync, extract_to_file,
};
pub use llm::{ChatMessage, CompletionBackend, CompletionRequest, RawCompletion, RetryPolicy};
