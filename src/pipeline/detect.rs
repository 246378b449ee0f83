//! Format detection: classify the input file from its extension and header
//! bytes, and auto-discover the single input file the CLI convention expects.
//!
//! Extension alone is not trusted — a `menu.pdf` that starts with JPEG magic
//! is treated as a JPEG, and a file whose header matches none of the
//! supported formats is rejected outright rather than handed to pdfium or
//! tesseract to fail confusingly later. Detection reads at most 8 bytes.

use crate::document::{FileType, SourceDocument};
use crate::error::MenuExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Classify a file as one of the supported input formats.
pub fn detect(path: &Path) -> Result<SourceDocument, MenuExtractError> {
    if !path.exists() {
        return Err(MenuExtractError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let by_extension = extension_type(path);

    let mut header = [0u8; 8];
    let read = match std::fs::File::open(path) {
        Ok(mut f) => f.read(&mut header).unwrap_or(0),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MenuExtractError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(MenuExtractError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };
    let by_magic = magic_type(&header[..read]);

    // Magic bytes win over a lying extension; a recognised extension with a
    // header that matches no supported format is rejected here rather than
    // handed to pdfium or tesseract.
    let file_type = match (by_magic, by_extension) {
        (Some(magic), _) => magic,
        (None, Some(_)) => {
            return Err(MenuExtractError::UnsupportedFileType {
                path: path.to_path_buf(),
                detail: format!(
                    "header bytes {:02X?} do not match any supported format",
                    &header[..read.min(4)]
                ),
            });
        }
        (None, None) => {
            return Err(MenuExtractError::UnsupportedFileType {
                path: path.to_path_buf(),
                detail: match path.extension().and_then(|e| e.to_str()) {
                    Some(ext) => format!("extension '{ext}'"),
                    None => "no file extension".to_string(),
                },
            });
        }
    };

    debug!("detected {} as {}", path.display(), file_type);
    Ok(SourceDocument {
        path: path.to_path_buf(),
        file_type,
    })
}

/// Auto-discover the single menu file in `dir`.
///
/// The operator contract is "exactly one menu file in the input location":
/// zero candidates and multiple candidates are both errors, never a guess.
pub fn discover_input(dir: &Path) -> Result<PathBuf, MenuExtractError> {
    let entries = std::fs::read_dir(dir).map_err(|_| MenuExtractError::NoInputFound {
        dir: dir.to_path_buf(),
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && extension_type(p).is_some())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(MenuExtractError::NoInputFound {
            dir: dir.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        n => Err(MenuExtractError::AmbiguousInput {
            dir: dir.to_path_buf(),
            count: n,
        }),
    }
}

fn extension_type(path: &Path) -> Option<FileType> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => Some(FileType::Pdf),
        Some("jpg") | Some("jpeg") => Some(FileType::Jpeg),
        Some("png") => Some(FileType::Png),
        _ => None,
    }
}

fn magic_type(header: &[u8]) -> Option<FileType> {
    if header.starts_with(b"%PDF") {
        Some(FileType::Pdf)
    } else if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(FileType::Jpeg)
    } else if header.starts_with(&PNG_MAGIC) {
        Some(FileType::Png)
    } else {
        None
    }
}
