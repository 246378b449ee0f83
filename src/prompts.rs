//! Prompts for LLM-based menu extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the output schema and the
//!    anti-hallucination rules live in exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompts without
//!    a real model, so a rule silently dropped from the prompt is a test
//!    failure, not a production surprise.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

use crate::document::ExtractedText;

/// Default system prompt: the exact output schema plus the rules that keep
/// the model honest about source values.
///
/// The two provenance rules (verbatim prices, header-only categories) are
/// also *enforced* after parsing by the response normalizer — the prompt is
/// the first line of defence, not the only one.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a precise data-extraction engine. You will receive the raw text of a restaurant menu. Return ONLY a single valid JSON object with this exact structure:

{
  "restaurant_name": string or null,
  "items": [
    {
      "name": string,
      "description": string or null,
      "price": string or null,
      "category": string or null
    }
  ]
}

Rules:
1. Every item needs a non-empty "name". Keep items in the order they appear in the text.
2. Copy each "price" VERBATIM from the text, including the currency symbol and exact digits (e.g. "₹60", "$12.50"). If an item has no price in the text, use null. NEVER invent, convert, or reformat a price.
3. Set "category" only when the text shows a visible section header above the item (e.g. "South Indian", "Beverages"); copy the header as written. Otherwise use null. Never invent cuisine labels.
4. Use "description" for descriptive text printed with the item, or null.
5. Output the JSON object only — no explanations, no markdown fences, no surrounding prose."#;

/// Corrective instruction appended to the system prompt on the single repair
/// attempt after an invalid first reply.
pub const REPAIR_INSTRUCTION: &str = r#"

IMPORTANT: your previous reply was not valid JSON matching the schema above. Respond again with ONLY the valid JSON object — no other text of any kind."#;

/// Build the user message embedding the extracted text.
///
/// `max_chars` truncates very long documents at a character boundary with an
/// explicit marker, so the model never sees a silently clipped word as the
/// end of the menu.
pub fn build_user_prompt(text: &ExtractedText, max_chars: usize) -> String {
    let full = text.full_text();
    let body = if full.chars().count() > max_chars {
        let clipped: String = full.chars().take(max_chars).collect();
        format!("{clipped}\n[text truncated]")
    } else {
        full
    };
    format!("Extract the menu from the following document text:\n\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextSource;

    fn text(s: &str) -> ExtractedText {
        ExtractedText {
            pages: vec![s.to_string()],
            source: TextSource::Native,
        }
    }

    #[test]
    fn system_prompt_states_the_invariants() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("VERBATIM"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("restaurant_name"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("section header"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON object only"));
    }

    #[test]
    fn user_prompt_embeds_text_verbatim() {
        let prompt = build_user_prompt(&text("MASALA DOSA ₹60"), 60_000);
        assert!(prompt.contains("MASALA DOSA ₹60"));
        assert!(!prompt.contains("[text truncated]"));
    }

    #[test]
    fn user_prompt_truncates_with_marker() {
        let long = "x".repeat(1000);
        let prompt = build_user_prompt(&text(&long), 300);
        assert!(prompt.contains("[text truncated]"));
        assert!(prompt.chars().count() < 1000);
    }

    #[test]
    fn identical_text_builds_identical_prompts() {
        let a = build_user_prompt(&text("CAFE UNO\nDOSA ₹60"), 60_000);
        let b = build_user_prompt(&text("CAFE UNO\nDOSA ₹60"), 60_000);
        assert_eq!(a, b);
    }
}
