//! File processing for document loading.
//!
//! This module handles:
//! - File type detection and validation
//! - Text extraction (delegated to `doc-extract`)
//! - Whitespace normalization so every format segments the same way

use doc_extract::{DocumentKind, ExtractError};
use std::path::Path;

/// Check if a file is a supported document type
pub fn is_supported_document(path: &Path) -> bool {
    doc_extract::is_supported_file_type(path)
}

/// Extract text from a file whose bytes are already in memory.
///
/// Text formats are decoded from `bytes`; PDF and DOCX are parsed from the
/// path. Blocking: call from `spawn_blocking`.
pub fn extract_text_from_file(path: &Path, bytes: &[u8]) -> Result<String, ExtractError> {
    let raw = match DocumentKind::from_path(path) {
        Some(DocumentKind::PlainText) | Some(DocumentKind::Markdown) => {
            doc_extract::decode_text_bytes(bytes)
        }
        Some(_) => doc_extract::extract_text(path)?,
        None => {
            return Err(ExtractError::UnsupportedType(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            ))
        }
    };
    Ok(normalize_extracted_text(&raw))
}

/// Normalize whitespace in extracted text.
///
/// Line endings become `\n`, form feeds become paragraph breaks, runs of
/// spaces/tabs collapse to one space, trailing spaces are removed, and more
/// than one blank line collapses to a single blank line.
pub fn normalize_extracted_text(raw: &str) -> String {
    let unified = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{c}', "\n\n")
        .replace('\0', "");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        out.push_str(&collapsed);
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_document() {
        assert!(is_supported_document(Path::new("manual.PDF")));
        assert!(is_supported_document(Path::new("guia.docx")));
        assert!(is_supported_document(Path::new("notas.md")));
        assert!(!is_supported_document(Path::new("planilla.xlsx")));
        assert!(!is_supported_document(Path::new("README")));
    }

    #[test]
    fn test_normalize_extracted_text() {
        let raw = "  Título   principal \r\n\r\n\r\n\r\nPrimer\tpárrafo  aquí.\u{c}Segunda página.\n";
        assert_eq!(
            normalize_extracted_text(raw),
            "Título principal\n\nPrimer párrafo aquí.\n\nSegunda página."
        );
    }

    #[test]
    fn test_normalize_keeps_single_newlines() {
        assert_eq!(normalize_extracted_text("uno\ndos\n\ntres"), "uno\ndos\n\ntres");
        assert_eq!(normalize_extracted_text("\n\n   \n"), "");
    }

    #[test]
    fn test_extract_plain_text_from_bytes() {
        let bytes = "\u{feff}hola\r\nmundo".as_bytes();
        let text = extract_text_from_file(Path::new("a.txt"), bytes).unwrap();
        assert_eq!(text, "hola\nmundo");
    }

    #[test]
    fn test_extract_rejects_unsupported() {
        let err = extract_text_from_file(Path::new("a.xlsx"), b"").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(ext) if ext == "xlsx"));
    }
}
