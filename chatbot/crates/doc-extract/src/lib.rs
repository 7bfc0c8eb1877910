//! Doc Extract - plain text from the manuals the chatbot answers questions about
//!
//! This crate turns a file on disk into plain text:
//! - PDF via pdf-extract, with a raw lopdf content-stream fallback
//! - DOCX via the `word/document.xml` part of the ZIP container
//! - TXT / MD read as UTF-8
//!
//! Paragraph boundaries are preserved as blank lines so callers can segment
//! the result without knowing which format it came from.

pub mod docx;
pub mod pdf;

use std::path::{Path, PathBuf};

/// Errors raised while extracting text from a single file
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("cannot read '{file}': this PDF has an incompatible format")]
    IncompatiblePdf { file: String },
    #[error("invalid DOCX '{file}': {reason}")]
    InvalidDocx { file: String, reason: String },
}

/// The document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
    Markdown,
}

impl DocumentKind {
    /// Detect the kind from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// MIME type used when serving the raw file
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

/// Check if a file is a supported document type
pub fn is_supported_file_type(path: &Path) -> bool {
    DocumentKind::from_path(path).is_some()
}

/// Extract plain text from a file based on its extension
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Pdf) => pdf::extract_pdf_text(path),
        Some(DocumentKind::Docx) => docx::extract_docx_text(path),
        Some(DocumentKind::PlainText) | Some(DocumentKind::Markdown) => {
            let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(decode_text_bytes(&bytes))
        }
        None => Err(ExtractError::UnsupportedType(display_name(path))),
    }
}

/// Decode text file bytes as UTF-8, tolerating a BOM and invalid sequences
pub fn decode_text_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).replace("\r\n", "\n")
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
