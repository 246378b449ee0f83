//! Text acquisition: native PDF text layer first, optical extraction as the
//! fallback, images straight to OCR.
//!
//! The two strategies sit behind one function so the rest of the pipeline
//! never branches on file type again. The fallback rule is deliberately a
//! pure predicate ([`text_layer_usable`]): a scanned PDF often carries a few
//! stray glyphs of embedded text (a watermark, a scanner tag line) that would
//! otherwise masquerade as a usable text layer and starve the model of the
//! actual menu.

use crate::config::ExtractionConfig;
use crate::document::{ExtractedText, FileType, SourceDocument, TextSource};
use crate::error::MenuExtractError;
use crate::pipeline::{ocr, preprocess};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Pull machine-readable text out of the source document.
///
/// Policy:
/// - PDFs: read the embedded text layer; fall back to OCR of the same pages
///   when the layer is below `min_text_layer_chars` non-whitespace chars.
/// - Images: OCR only.
///
/// Every page is cleaned by [`preprocess::clean_page`] before leaving this
/// function, so the prompt and the provenance checks see the same text.
///
/// Fails with [`MenuExtractError::EmptyText`] when the applicable strategies
/// yield nothing usable — an empty prompt is never passed downstream.
pub async fn acquire_text(
    doc: &SourceDocument,
    config: &ExtractionConfig,
) -> Result<ExtractedText, MenuExtractError> {
    let text = match doc.file_type {
        FileType::Pdf => {
            let native = native_pdf_text(&doc.path).await?;
            if text_layer_usable(&native, config.min_text_layer_chars) {
                info!(
                    "using native text layer: {} page(s), {} chars",
                    native.page_count(),
                    native.char_count()
                );
                native
            } else {
                info!(
                    "text layer too sparse ({} chars < {}), falling back to OCR",
                    native.char_count(),
                    config.min_text_layer_chars
                );
                ExtractedText {
                    pages: ocr::ocr_pdf(&doc.path, config).await?,
                    source: TextSource::Ocr,
                }
            }
        }
        FileType::Jpeg | FileType::Png => {
            debug!("image input, optical extraction only");
            ExtractedText {
                pages: ocr::ocr_image(&doc.path, &config.ocr_language).await?,
                source: TextSource::Ocr,
            }
        }
    };

    let text = ExtractedText {
        pages: text.pages.iter().map(|p| preprocess::clean_page(p)).collect(),
        source: text.source,
    };

    if text.is_empty() {
        return Err(MenuExtractError::EmptyText {
            path: doc.path.clone(),
        });
    }
    Ok(text)
}

/// The fallback rule: a text layer is usable when it carries at least
/// `threshold` non-whitespace characters across all pages.
pub fn text_layer_usable(text: &ExtractedText, threshold: usize) -> bool {
    text.char_count() >= threshold
}

/// Read the embedded text layer of every page, in document order.
async fn native_pdf_text(path: &Path) -> Result<ExtractedText, MenuExtractError> {
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let pdfium = Pdfium::default();
        let document =
            pdfium
                .load_pdf_from_file(&path, None)
                .map_err(|e| MenuExtractError::PdfRead {
                    path: path.clone(),
                    detail: format!("{e:?}"),
                })?;

        let pages: Vec<String> = document
            .pages()
            .iter()
            .map(|page| page.text().map(|t| t.all()).unwrap_or_default())
            .collect();

        debug!("native extraction: {} page(s)", pages.len());
        Ok(ExtractedText {
            pages,
            source: TextSource::Native,
        })
    })
    .await
    .map_err(|e| MenuExtractError::Internal(format!("PDF text task panicked: {e}")))?
}
