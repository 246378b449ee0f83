//! Text preprocessing: strip contact-info noise from acquired text before it
//! reaches the prompt.
//!
//! Menu headers and footers routinely carry phone numbers, email addresses,
//! and URLs. None of it helps extraction, and OCR mangles it into token
//! noise, so it is removed up front. Prices survive untouched: the phone
//! pattern needs at least ten digits on one line, far more than any menu
//! price — separators are limited to space and hyphen so a column of prices
//! on consecutive lines can never be mistaken for a phone number.

use once_cell::sync::Lazy;
use regex::Regex;

// +91 9876543210, 9876543210, 123-4567-8901 and similar.
static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+(]?\d{1,4}[) \-]?\d{3,4}[ \-]?\d{3,4}[ \-]?\d{3,4}").unwrap());

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").unwrap());

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").unwrap());

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").unwrap());

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Clean one page of extracted text: drop contact-info noise, then collapse
/// space runs and stacked blank lines while keeping the line structure the
/// category headers depend on.
pub fn clean_page(text: &str) -> String {
    let cleaned = RE_PHONE.replace_all(text, "");
    let cleaned = RE_EMAIL.replace_all(&cleaned, "");
    let cleaned = RE_URL.replace_all(&cleaned, "");
    let cleaned = RE_SPACES.replace_all(&cleaned, " ");
    let cleaned = RE_BLANK_LINES.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}
