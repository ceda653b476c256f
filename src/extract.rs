//! Plain-text extraction from uploaded files.
use tracing::debug;

use crate::error::{Error, Result};

const UNSUPPORTED: &str = "Unsupported file type. Only PDF, DOCX, TXT allowed.";

/// Extract plain text from an uploaded file, choosing the parser by the
/// filename's extension (case-insensitive).
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".txt") {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    } else if lower.ends_with(".docx") {
        extract_docx(bytes)
    } else if lower.ends_with(".pdf") {
        extract_pdf(bytes)
    } else {
        Err(Error::Validation(UNSUPPORTED.to_string()))
    }
}

/// Paragraph texts joined by newlines.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| Error::Validation(format!("Could not read DOCX file: {e}")))?;

    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        match child {
                            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                            docx_rs::RunChild::Tab(_) => text.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }
    Ok(paragraphs.join("\n"))
}

/// Page texts, each followed by a newline. Pages without extractable text
/// contribute only the newline.
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::Validation(format!("Could not read PDF file: {e}")))?;

    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!("No text on page {page_number}: {e}"),
        }
        text.push('\n');
    }
    Ok(text)
}
