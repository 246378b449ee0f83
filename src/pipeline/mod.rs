//! Pipeline stages for menu extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap an
//! implementation (e.g. a different OCR engine) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! detect ──▶ acquire ──▶ prompt ──▶ llm ──▶ normalize ──▶ assemble
//! (magic)  (pdfium/ocr)  (schema)  (retry)  (JSON scan)   (atomic write)
//! ```
//!
//! 1. [`detect`]    — classify the input as PDF/JPEG/PNG from extension and
//!    magic bytes; reject everything else
//! 2. [`acquire`]   — pull machine-readable text: native PDF text layer
//!    first, OCR fallback when the layer is empty or sparse
//! 3. [`ocr`]        — the optical backend: pdfium rasterisation + tesseract
//! 4. [`preprocess`] — strip contact-info noise (phone numbers, emails, URLs)
//!    and collapse whitespace before the text reaches the prompt
//! 5. [`normalize`]  — locate and parse the JSON object in the free-form
//!    model reply, then validate it against the schema and provenance
//!    invariants
//!
//! Prompt assembly lives in [`crate::prompts`], the completion client in
//! [`crate::llm`], and orchestration plus the atomic result write in
//! [`crate::extract`].

pub mod acquire;
pub mod detect;
pub mod normalize;
pub mod ocr;
pub mod preprocess;
