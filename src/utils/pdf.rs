//! PDF text extraction utilities.
//!
//! Text is pulled page by page with lopdf so callers get it in page order. When
//! lopdf cannot open a document at all, pdf-extract gets a second try on the
//! whole file.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("File not found or not a valid PDF: {0}")]
    InvalidFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the text of every page, in page order.
///
/// Pages whose text cannot be decoded come back as empty strings rather than
/// failing the document.
pub fn extract_pages(path: &Path) -> Result<Vec<String>, PdfExtractError> {
    if !path.exists() {
        return Err(PdfExtractError::InvalidFile(format!(
            "File not found: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(PdfExtractError::InvalidFile(format!(
            "Not a file: {}",
            path.display()
        )));
    }

    let document = match lopdf::Document::load(path) {
        Ok(document) => document,
        Err(load_err) => {
            tracing::debug!(
                "lopdf could not open {} ({}), falling back to pdf-extract",
                path.display(),
                load_err
            );
            return pdf_extract::extract_text(path)
                .map(|text| vec![text])
                .map_err(|e| PdfExtractError::ExtractionFailed(format!("{}: {}", load_err, e)));
        }
    };

    // get_pages is keyed by page number, so iteration is already in page order
    let pages = document.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                tracing::debug!(
                    "Skipping undecodable page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                texts.push(String::new());
            }
        }
    }

    Ok(texts)
}

/// Extract text from a PDF file, pages concatenated in order.
pub fn extract_text(path: &Path) -> Result<String, PdfExtractError> {
    let mut text = String::new();
    for page in extract_pages(path)? {
        text.push_str(&page);
        if !page.is_empty() && !page.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}
