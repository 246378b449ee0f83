//! Optical extraction: pdfium rasterisation plus the `tesseract` CLI.
//!
//! ## Why the tesseract binary instead of a bindings crate?
//!
//! The C-API binding crates drag in a native build of leptonica/tesseract and
//! break on minor distro upgrades. Shelling out to the `tesseract` binary is
//! what operators already have installed, is trivially sandboxable, and the
//! failure mode is a clean [`MenuExtractError::OcrUnavailable`] instead of a
//! linker error at build time.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state that is not safe to
//! drive from async contexts, and tesseract is a blocking subprocess. Both
//! run on the blocking thread pool so the runtime's worker threads never
//! stall mid-pipeline.

use crate::config::ExtractionConfig;
use crate::error::MenuExtractError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Check whether the tesseract binary can run at all.
pub fn ocr_available() -> bool {
    Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// OCR a single raster image file (JPEG/PNG input goes straight to tesseract,
/// no re-encoding).
pub async fn ocr_image(path: &Path, language: &str) -> Result<Vec<String>, MenuExtractError> {
    let path = path.to_path_buf();
    let lang = language.to_string();

    tokio::task::spawn_blocking(move || {
        let text = run_tesseract(&path, &lang)?;
        Ok(vec![text])
    })
    .await
    .map_err(|e| MenuExtractError::Internal(format!("OCR task panicked: {e}")))?
}

/// OCR every page of a PDF: rasterise each page to a PNG in a temp directory,
/// then recognise them in page order.
///
/// The `TempDir` cleans up the intermediate PNGs automatically, including on
/// error and panic paths.
pub async fn ocr_pdf(
    path: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<String>, MenuExtractError> {
    let path = path.to_path_buf();
    let lang = config.ocr_language.clone();
    let max_pixels = config.ocr_max_pixels;

    tokio::task::spawn_blocking(move || ocr_pdf_blocking(&path, &lang, max_pixels))
        .await
        .map_err(|e| MenuExtractError::Internal(format!("OCR task panicked: {e}")))?
}

fn ocr_pdf_blocking(
    pdf_path: &Path,
    language: &str,
    max_pixels: u32,
) -> Result<Vec<String>, MenuExtractError> {
    // Preflight before spending time rasterising pages.
    if !ocr_available() {
        return Err(MenuExtractError::OcrUnavailable {
            detail: "tesseract binary not found on PATH".to_string(),
        });
    }

    let temp_dir = TempDir::new().map_err(|e| MenuExtractError::Internal(e.to_string()))?;
    let page_images = rasterise_pages(pdf_path, temp_dir.path(), max_pixels)?;
    info!(
        "rasterised {} page(s) of {} for OCR",
        page_images.len(),
        pdf_path.display()
    );

    let mut pages = Vec::with_capacity(page_images.len());
    for (idx, image_path) in page_images.iter().enumerate() {
        let text = run_tesseract(image_path, language)?;
        debug!("OCR page {}: {} chars", idx + 1, text.len());
        pages.push(text);
    }
    Ok(pages)
}

/// Render every PDF page into `<out_dir>/page-N.png`, in page order.
fn rasterise_pages(
    pdf_path: &Path,
    out_dir: &Path,
    max_pixels: u32,
) -> Result<Vec<PathBuf>, MenuExtractError> {
    let pdfium = Pdfium::default();
    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| MenuExtractError::PdfRead {
                path: pdf_path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut paths = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| MenuExtractError::PdfRead {
                    path: pdf_path.to_path_buf(),
                    detail: format!("rasterisation failed for page {}: {e:?}", idx + 1),
                })?;
        let image = bitmap.as_image();

        let png_path = out_dir.join(format!("page-{}.png", idx + 1));
        image
            .save_with_format(&png_path, image::ImageFormat::Png)
            .map_err(|e| MenuExtractError::Internal(format!("PNG encode: {e}")))?;
        debug!(
            "rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        paths.push(png_path);
    }
    Ok(paths)
}

/// Run `tesseract <image> stdout -l <lang>` and return the recognised text.
fn run_tesseract(image_path: &Path, language: &str) -> Result<String, MenuExtractError> {
    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MenuExtractError::OcrUnavailable {
                    detail: "tesseract binary not found on PATH".to_string(),
                }
            } else {
                MenuExtractError::OcrUnavailable {
                    detail: format!("failed to run tesseract: {e}"),
                }
            }
        })?;

    if !output.status.success() {
        return Err(MenuExtractError::OcrUnavailable {
            detail: format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(clean_ocr_text(&String::from_utf8_lossy(&output.stdout)))
}

/// Tesseract terminates each page with a form feed; strip it and normalise
/// line endings so downstream whitespace handling sees plain text.
fn clean_ocr_text(raw: &str) -> String {
    raw.replace('\x0c', "").replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_form_feed_and_crlf() {
        assert_eq!(clean_ocr_text("MASALA DOSA ₹60\x0c"), "MASALA DOSA ₹60");
        assert_eq!(clean_ocr_text("a\r\nb"), "a\nb");
    }

    #[test]
    fn missing_binary_maps_to_ocr_unavailable() {
        // Use an image path that cannot exist; if tesseract is installed the
        // run fails with a non-zero exit, if not with NotFound — both must
        // surface as OcrUnavailable, never as a panic or an io::Error.
        let err = run_tesseract(Path::new("/nonexistent/page.png"), "eng").unwrap_err();
        assert!(matches!(err, MenuExtractError::OcrUnavailable { .. }));
        assert_eq!(err.stage(), "text extraction");
    }
}
