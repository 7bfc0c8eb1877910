//! PDF text extraction.
//!
//! pdf-extract is tried first because it handles font encodings; malformed
//! files that make it fail (or panic) are retried with a raw lopdf walk over
//! the page content streams.

use std::path::Path;

use crate::{display_name, ExtractError};

/// Extract the text of every page, one page per block
pub fn extract_pdf_text(file_path: &Path) -> Result<String, ExtractError> {
    // Use catch_unwind to capture panics from pdf-extract library
    let pages_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_by_pages(file_path)
    }));

    let failure = match pages_result {
        Ok(Ok(pages)) => return Ok(join_pages(&pages)),
        Ok(Err(e)) => e.to_string(),
        Err(panic_payload) => {
            if let Some(s) = panic_payload.downcast_ref::<&str>() {
                format!("panic: {}", s)
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                format!("panic: {}", s)
            } else {
                "panic: unknown".to_string()
            }
        }
    };

    tracing::debug!(
        file = %display_name(file_path),
        error = %failure,
        "pdf-extract failed, trying lopdf fallback"
    );

    match extract_pdf_text_via_lopdf(file_path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(chars = text.len(), "lopdf fallback succeeded");
            Ok(text)
        }
        Ok(_) => {
            tracing::debug!("lopdf fallback produced no text");
            Err(ExtractError::IncompatiblePdf {
                file: display_name(file_path),
            })
        }
        Err(fallback_err) => {
            tracing::debug!(error = %fallback_err, "lopdf fallback failed");
            Err(ExtractError::IncompatiblePdf {
                file: display_name(file_path),
            })
        }
    }
}

fn join_pages(pages: &[String]) -> String {
    let mut extracted_text = String::new();
    for page_text in pages {
        extracted_text.push_str(page_text.trim_end());
        // Blank line between pages so a page break never glues two paragraphs
        extracted_text.push_str("\n\n");
    }
    extracted_text
}

/// Fallback PDF text extraction using lopdf when pdf-extract fails.
/// Less accurate for complex fonts but more tolerant of malformed PDFs.
pub fn extract_pdf_text_via_lopdf(file_path: &Path) -> Result<String, lopdf::Error> {
    use lopdf::{Document, Object};

    let doc = Document::load(file_path)?;

    let mut all_text = String::new();
    for (_page_num, page_id) in doc.get_pages() {
        if let Ok(content) = doc.get_page_content(page_id) {
            let operations = lopdf::content::Content::decode(&content)
                .map(|c| c.operations)
                .unwrap_or_default();

            for op in operations {
                match op.operator.as_str() {
                    // Tj: Show text string
                    "Tj" => {
                        if let Some(Object::String(bytes, _)) = op.operands.first() {
                            all_text.push_str(&decode_pdf_string(bytes));
                        }
                    }
                    // TJ: Show text array (with kerning)
                    "TJ" => {
                        if let Some(Object::Array(arr)) = op.operands.first() {
                            for item in arr {
                                if let Object::String(bytes, _) = item {
                                    all_text.push_str(&decode_pdf_string(bytes));
                                }
                            }
                        }
                    }
                    // Text positioning that indicates new line/paragraph
                    "Td" | "TD" | "T*" | "'" | "\"" => {
                        if !all_text.ends_with('\n') && !all_text.ends_with(' ') {
                            all_text.push(' ');
                        }
                    }
                    "ET" => {
                        if !all_text.ends_with('\n') {
                            all_text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
        }
        all_text.push('\n'); // Page break
    }

    Ok(all_text)
}

/// Try UTF-8 first, then Latin-1
fn decode_pdf_string(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect())
}
