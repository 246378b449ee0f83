//! Error types for the menu2json library.
//!
//! One enum, one variant per failure class. The pipeline never substitutes a
//! default or partial result for a failed stage: every variant propagates to
//! the caller, and the CLI turns [`MenuExtractError::stage`] into the
//! "which stage failed" line of its exit message.
//!
//! The only locally-handled failure is a *transient* LLM error, which the
//! completion client retries with backoff before surfacing
//! [`MenuExtractError::LlmRequest`].

use std::path::PathBuf;
use thiserror::Error;

/// Whether an LLM request failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Rate limiting, timeouts, connection errors, 5xx responses.
    Transient,
    /// Authentication failures, malformed requests, unusable responses.
    Fatal,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::Transient => write!(f, "transient"),
            LlmErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// All errors returned by the menu2json library.
#[derive(Debug, Error)]
pub enum MenuExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("menu file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Input auto-discovery found no recognised menu file.
    #[error("no menu file found in '{dir}'\nPlace exactly one .pdf, .jpg, .jpeg or .png file there.")]
    NoInputFound { dir: PathBuf },

    /// Input auto-discovery found more than one candidate file.
    #[error("{count} menu files found in '{dir}' — expected exactly one.\nPass the file path explicitly to disambiguate.")]
    AmbiguousInput { dir: PathBuf, count: usize },

    /// The file extension or magic bytes identify an unsupported format.
    #[error("unsupported file type for '{path}': {detail}\nSupported formats: PDF, JPEG, PNG.")]
    UnsupportedFileType { path: PathBuf, detail: String },

    // ── Text acquisition errors ───────────────────────────────────────────
    /// pdfium could not open or read the PDF.
    #[error("failed to read PDF '{path}': {detail}")]
    PdfRead { path: PathBuf, detail: String },

    /// The OCR backend (tesseract) is not installed or cannot run.
    #[error("OCR engine unavailable: {detail}\nInstall tesseract (e.g. apt install tesseract-ocr) to process scanned documents.")]
    OcrUnavailable { detail: String },

    /// Neither the text layer nor OCR produced any usable text.
    #[error("no usable text extracted from '{path}' — the document appears to be empty or unreadable")]
    EmptyText { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The completion request failed after the retry budget was spent.
    #[error("LLM request failed ({kind}) after {attempts} attempt(s): {detail}")]
    LlmRequest {
        kind: LlmErrorKind,
        attempts: u32,
        detail: String,
    },

    /// The model reply contained no parseable JSON object, even after the
    /// repair re-prompt. `raw` carries the offending reply for diagnostics.
    #[error("could not parse a JSON object from the model reply: {detail}")]
    ResponseParse { detail: String, raw: String },

    /// The parsed JSON does not satisfy the menu schema or its provenance
    /// invariants, even after the repair re-prompt.
    #[error("model output failed schema validation: {detail}")]
    SchemaValidation { detail: String, raw: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or a required credential is missing.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MenuExtractError {
    /// Human-readable name of the pipeline stage this error belongs to.
    ///
    /// Used by the CLI so a failing run always names the stage that broke.
    pub fn stage(&self) -> &'static str {
        match self {
            MenuExtractError::FileNotFound { .. }
            | MenuExtractError::PermissionDenied { .. }
            | MenuExtractError::NoInputFound { .. }
            | MenuExtractError::AmbiguousInput { .. }
            | MenuExtractError::UnsupportedFileType { .. } => "format detection",
            MenuExtractError::PdfRead { .. }
            | MenuExtractError::OcrUnavailable { .. }
            | MenuExtractError::EmptyText { .. } => "text extraction",
            MenuExtractError::LlmRequest { .. } => "completion request",
            MenuExtractError::ResponseParse { .. }
            | MenuExtractError::SchemaValidation { .. } => "response normalization",
            MenuExtractError::OutputWrite { .. } => "result write",
            MenuExtractError::InvalidConfig(_) => "configuration",
            MenuExtractError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_request_display() {
        let e = MenuExtractError::LlmRequest {
            kind: LlmErrorKind::Transient,
            attempts: 3,
            detail: "HTTP 429".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("transient"), "got: {msg}");
        assert!(msg.contains("3 attempt"), "got: {msg}");
    }

    #[test]
    fn stage_names_cover_pipeline() {
        let e = MenuExtractError::EmptyText {
            path: PathBuf::from("menu.pdf"),
        };
        assert_eq!(e.stage(), "text extraction");

        let e = MenuExtractError::ResponseParse {
            detail: "unbalanced braces".into(),
            raw: "not json".into(),
        };
        assert_eq!(e.stage(), "response normalization");

        let e = MenuExtractError::OutputWrite {
            path: PathBuf::from("out.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(e.stage(), "result write");
    }

    #[test]
    fn unsupported_type_display_lists_formats() {
        let e = MenuExtractError::UnsupportedFileType {
            path: PathBuf::from("menu.docx"),
            detail: "extension 'docx'".into(),
        };
        assert!(e.to_string().contains("PDF, JPEG, PNG"));
    }
}
