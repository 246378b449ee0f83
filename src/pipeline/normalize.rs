//! Response normalization: turn the model's free-form reply into a validated
//! [`MenuDocument`], or say precisely why that is impossible.
//!
//! The reply *should* be one JSON object but is routinely wrapped in prose or
//! a ```json fence despite the prompt. Rather than exception-driven string
//! sniffing, this module is a small parser with an explicit grammar:
//!
//! 1. strip an outer code fence if present;
//! 2. locate the first `{` and its balanced matching `}`, tracking string
//!    literals and escapes so braces inside values don't break the balance;
//! 3. parse that slice as JSON — failure here is a *parse* error;
//! 4. shape the value into `MenuDocument` — failure here is a *schema* error;
//! 5. run the provenance checks: non-empty item names, prices that literally
//!    appear in the extracted text, categories present in the text.
//!
//! Steps 3–5 failing is what triggers the single repair re-prompt in
//! [`crate::extract`]; this module itself never talks to the model.

use crate::document::{ExtractedText, MenuDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Why a reply could not be normalized, split the way the error taxonomy
/// needs: parse failures and schema failures surface as different errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeIssue {
    /// No parseable JSON object in the reply.
    Parse(String),
    /// Parsed fine, but the shape or the provenance invariants don't hold.
    Schema(String),
}

impl NormalizeIssue {
    pub fn detail(&self) -> &str {
        match self {
            NormalizeIssue::Parse(d) | NormalizeIssue::Schema(d) => d,
        }
    }
}

/// Parse and validate a raw model reply against the extracted source text.
pub fn parse_and_validate(
    raw: &str,
    source: &ExtractedText,
) -> Result<MenuDocument, NormalizeIssue> {
    let unfenced = strip_code_fence(raw);
    let candidate = find_json_object(unfenced)
        .ok_or_else(|| NormalizeIssue::Parse("no balanced JSON object in reply".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| NormalizeIssue::Parse(format!("invalid JSON: {e}")))?;

    let document: MenuDocument = serde_json::from_value(value)
        .map_err(|e| NormalizeIssue::Schema(format!("shape mismatch: {e}")))?;

    validate(&document, source)?;
    debug!(
        "normalized reply: {} item(s), restaurant {:?}",
        document.items.len(),
        document.restaurant_name
    );
    Ok(document)
}

// ── Step 1: fence stripping ──────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip one outer ``` fence (with or without a `json` tag). Lossless for
/// the content: the inner text is returned exactly as it appeared.
fn strip_code_fence(input: &str) -> &str {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input,
    }
}

// ── Step 2: balanced object scan ─────────────────────────────────────────

/// Locate the first `{` and its matching balanced `}`, respecting JSON
/// string-literal quoting so `{"note": "a } inside"}` scans correctly.
///
/// Returns the candidate object slice, or None when no balanced object
/// exists (truncated output, prose-only reply).
fn find_json_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in input[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Step 5: provenance validation ────────────────────────────────────────

/// Collapse all whitespace runs to single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check the schema constraints serde cannot express, plus the two
/// anti-hallucination invariants.
fn validate(document: &MenuDocument, source: &ExtractedText) -> Result<(), NormalizeIssue> {
    let source_norm = normalize_whitespace(&source.full_text());
    let source_lower = source_norm.to_lowercase();

    for (idx, item) in document.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(NormalizeIssue::Schema(format!(
                "item {} has an empty name",
                idx + 1
            )));
        }

        // The model must copy prices, never synthesize them.
        if let Some(price) = &item.price {
            let price_norm = normalize_whitespace(price);
            if price_norm.is_empty() || !source_norm.contains(&price_norm) {
                return Err(NormalizeIssue::Schema(format!(
                    "item '{}' has price '{}' which does not appear in the source text",
                    item.name, price
                )));
            }
        }

        // Categories come from visible section headers, not invented labels.
        if let Some(category) = &item.category {
            let category_norm = normalize_whitespace(category).to_lowercase();
            if category_norm.is_empty() || !source_lower.contains(&category_norm) {
                return Err(NormalizeIssue::Schema(format!(
                    "item '{}' has category '{}' which does not appear in the source text",
                    item.name, category
                )));
            }
        }
    }
    Ok(())
}
