//! DOCX text extraction.
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml`.
//! Paragraphs become blank-line separated blocks and every table row becomes
//! its own block with cells joined by ` | `.

use std::io::Read;
use std::path::Path;

use crate::{display_name, ExtractError};

/// Separator placed between table cells of the same row
pub const TABLE_CELL_SEPARATOR: &str = " | ";

/// Extract text content from a DOCX file
pub fn extract_docx_text(file_path: &Path) -> Result<String, ExtractError> {
    let invalid = |reason: String| ExtractError::InvalidDocx {
        file: display_name(file_path),
        reason,
    };

    let file = std::fs::File::open(file_path).map_err(|source| ExtractError::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| invalid(format!("invalid archive: {}", e)))?;

    let mut doc_xml = archive
        .by_name("word/document.xml")
        .map_err(|_| invalid("no word/document.xml found".to_string()))?;

    let mut xml_content = String::new();
    doc_xml
        .read_to_string(&mut xml_content)
        .map_err(|e| invalid(format!("failed to read document.xml: {}", e)))?;

    Ok(extract_plaintext_from_docx_xml(&xml_content))
}

/// Extract text content from DOCX XML (word/document.xml)
pub fn extract_plaintext_from_docx_xml(xml: &str) -> String {
    let mut result = String::new();
    let mut in_text = false;
    let mut table_depth = 0usize;
    let mut chars = xml.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            if in_text {
                result.push(c);
            }
            continue;
        }

        let mut tag = String::new();
        for tc in chars.by_ref() {
            if tc == '>' {
                break;
            }
            tag.push(tc);
        }

        let self_closing = tag.ends_with('/');
        let closing = tag.starts_with('/');
        let name = tag
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match (name, closing) {
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:tab", false) => result.push(' '),
            ("w:br", false) | ("w:cr", false) => result.push('\n'),
            ("w:tbl", false) if !self_closing => {
                end_block(&mut result);
                table_depth += 1;
            }
            ("w:tbl", true) => table_depth = table_depth.saturating_sub(1),
            ("w:tc", true) => {
                trim_trailing_spaces(&mut result);
                result.push_str(TABLE_CELL_SEPARATOR);
            }
            ("w:tr", true) => {
                if let Some(stripped) = result.strip_suffix(TABLE_CELL_SEPARATOR) {
                    let len = stripped.len();
                    result.truncate(len);
                }
                end_block(&mut result);
            }
            ("w:p", true) => {
                if table_depth > 0 {
                    // Paragraphs inside a cell stay on the row's line
                    if !result.ends_with(' ') && !result.ends_with('\n') && !result.is_empty() {
                        result.push(' ');
                    }
                } else {
                    end_block(&mut result);
                }
            }
            _ => {}
        }
    }

    collapse_blank_lines(&decode_xml_entities(&result))
}

/// Terminate the current block with a blank line
fn end_block(result: &mut String) {
    trim_trailing_spaces(result);
    if result.is_empty() {
        return;
    }
    while !result.ends_with("\n\n") {
        result.push('\n');
    }
}

fn trim_trailing_spaces(result: &mut String) {
    let len = result.trim_end_matches(' ').len();
    result.truncate(len);
}

/// Reduce runs of 3+ newlines to a single blank line and trim the ends
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Decode the predefined XML entities plus numeric character references
pub fn decode_xml_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &after[1..];
            continue;
        };

        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn paragraph(text: &str) -> String {
        format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            text
        )
    }

    #[test]
    fn test_paragraphs_become_blocks() {
        let xml = format!(
            "<w:document><w:body>{}{}</w:body></w:document>",
            paragraph("La firma digital tiene validez legal."),
            paragraph("El expediente se crea desde el escritorio.")
        );
        let text = extract_plaintext_from_docx_xml(&xml);
        assert_eq!(
            text,
            "La firma digital tiene validez legal.\n\nEl expediente se crea desde el escritorio."
        );
    }

    #[test]
    fn test_paragraph_properties_do_not_split_runs() {
        // <w:pPr> and <w:proofErr> must not be mistaken for paragraph tags
        let xml = r#"<w:p><w:pPr/><w:r><w:t>firma</w:t></w:r><w:proofErr w:type="spellStart"/><w:r><w:t xml:space="preserve"> digital</w:t></w:r></w:p>"#;
        assert_eq!(extract_plaintext_from_docx_xml(xml), "firma digital");
    }

    #[test]
    fn test_table_rows_become_blocks() {
        let xml = concat!(
            "<w:tbl><w:tblPr/>",
            "<w:tr><w:tc><w:p><w:r><w:t>Equipo</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>Contacto</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>Soporte</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>interno 123</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>"
        );
        let text = extract_plaintext_from_docx_xml(xml);
        assert_eq!(text, "Equipo | Contacto\n\nSoporte | interno 123");
    }

    #[test]
    fn test_tabs_and_breaks() {
        let xml = "<w:p><w:r><w:t>uno</w:t><w:tab/><w:t>dos</w:t><w:br/><w:t>tres</w:t></w:r></w:p>";
        assert_eq!(extract_plaintext_from_docx_xml(xml), "uno dos\ntres");
    }

    #[test]
    fn test_decode_xml_entities() {
        assert_eq!(decode_xml_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_xml_entities("&#225;rbol &#xF1;"), "árbol ñ");
        assert_eq!(decode_xml_entities("AT&T sin punto y coma"), "AT&T sin punto y coma");
        assert_eq!(decode_xml_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_extract_docx_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(paragraph("Firma digital &amp; validez").as_bytes())
            .unwrap();
        zip.finish().unwrap();

        assert_eq!(extract_docx_text(&path).unwrap(), "Firma digital & validez");
    }

    #[test]
    fn test_extract_docx_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roto.docx");
        std::fs::write(&path, b"not a zip").unwrap();

        let result = extract_docx_text(&path);
        assert!(matches!(
            result,
            Err(ExtractError::InvalidDocx { ref file, .. }) if file == "roto.docx"
        ));
    }

    #[test]
    fn test_extract_docx_without_document_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vacio.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/styles.xml", zip::write::FileOptions::default())
            .unwrap();
        zip.write_all(b"<w:styles/>").unwrap();
        zip.finish().unwrap();

        let err = extract_docx_text(&path).unwrap_err();
        assert!(err.to_string().contains("document.xml"));
    }
}
