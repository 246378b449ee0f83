//! Data model: everything that flows through the pipeline, plus the persisted
//! result shape.
//!
//! The types mirror the pipeline stages: [`SourceDocument`] comes out of
//! format detection, [`ExtractedText`] out of text acquisition,
//! [`crate::llm::RawCompletion`] out of the completion client, and [`MenuDocument`] /
//! [`ExtractionResult`] out of normalization and assembly. All of them are
//! plain values; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Jpeg,
    Png,
}

impl FileType {
    /// Lowercase tag used in the persisted metadata block.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Jpeg => "jpeg",
            FileType::Png => "png",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, FileType::Pdf)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified input file, produced by the format detector.
///
/// The page count is not known at detection time (that would require opening
/// the PDF); it is discovered during text acquisition as
/// [`ExtractedText::page_count`].
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub file_type: FileType,
}

/// Which extraction strategy produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// Embedded PDF text layer, read via pdfium.
    Native,
    /// Optical character recognition of rasterised pages.
    Ocr,
}

/// Machine-readable text pulled from the source document, one string per page
/// in document order.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub pages: Vec<String>,
    pub source: TextSource,
}

impl ExtractedText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages joined with a page-boundary marker, preserved for
    /// traceability in the prompt.
    pub fn full_text(&self) -> String {
        if self.pages.len() == 1 {
            return self.pages[0].clone();
        }
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push_str(&format!("\n\n--- page {} ---\n\n", i + 1));
            }
            out.push_str(page);
        }
        out
    }

    /// True when the concatenated, trimmed text has zero length.
    ///
    /// This is a terminal condition for the pipeline — an empty prompt is
    /// never sent to the model.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// Non-whitespace character count, used by the text-layer fallback rule.
    pub fn char_count(&self) -> usize {
        self.pages
            .iter()
            .map(|p| p.chars().filter(|c| !c.is_whitespace()).count())
            .sum()
    }
}

/// A single menu item as it appears in the source document.
///
/// `price` preserves the literal source value — digits and currency symbol —
/// exactly as present in the extracted text. `category` is the section header
/// the item appeared under, or `None` when the menu has no visible sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// The structured menu: restaurant name plus items in reading order.
///
/// Items are not required to be unique by name — menus repeat dishes across
/// sections (lunch vs. dinner) and sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuDocument {
    #[serde(default)]
    pub restaurant_name: Option<String>,
    pub items: Vec<MenuItem>,
}

/// Run metadata persisted alongside the extracted data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub filename: String,
    pub total_pages: usize,
    /// RFC 3339 UTC timestamp of the run.
    pub processing_date: String,
    pub model_used: String,
    pub file_type: FileType,
}

/// The persisted output: metadata plus validated menu data. Write-once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub metadata: RunMetadata,
    pub data: MenuDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(pages: &[&str]) -> ExtractedText {
        ExtractedText {
            pages: pages.iter().map(|s| s.to_string()).collect(),
            source: TextSource::Native,
        }
    }

    #[test]
    fn empty_when_pages_whitespace_only() {
        assert!(text(&["", "  \n\t "]).is_empty());
        assert!(!text(&["", "Dosa ₹60"]).is_empty());
    }

    #[test]
    fn full_text_marks_page_boundaries() {
        let t = text(&["first", "second"]);
        let full = t.full_text();
        assert!(full.contains("first"));
        assert!(full.contains("--- page 2 ---"));
        assert!(full.contains("second"));
    }

    #[test]
    fn single_page_has_no_marker() {
        assert_eq!(text(&["only page"]).full_text(), "only page");
    }

    #[test]
    fn char_count_ignores_whitespace() {
        assert_eq!(text(&["a b", " c\n"]).char_count(), 3);
    }

    #[test]
    fn menu_item_deserialises_with_missing_optionals() {
        let item: MenuItem = serde_json::from_str(r#"{"name": "MASALA DOSA"}"#).unwrap();
        assert_eq!(item.name, "MASALA DOSA");
        assert_eq!(item.price, None);
        assert_eq!(item.category, None);
    }

    #[test]
    fn menu_document_requires_items_array() {
        let err = serde_json::from_str::<MenuDocument>(r#"{"restaurant_name": "CAFE UNO"}"#);
        assert!(err.is_err(), "missing items must be rejected");
    }

    #[test]
    fn result_serialises_to_persisted_shape() {
        let result = ExtractionResult {
            metadata: RunMetadata {
                filename: "menu.pdf".into(),
                total_pages: 1,
                processing_date: "2026-01-01T00:00:00+00:00".into(),
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
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        assert_eq!(json["metadata"]["file_type"], "pdf");
        assert_eq!(json["metadata"]["total_pages"], 1);
        assert_eq!(json["data"]["items"][0]["price"], "₹60");
        assert_eq!(json["data"]["items"][0]["description"], serde_json::Value::Null);
    }
}
