//! Input validation for URLs, titles and paths.
//!
//! Everything here runs before any network or filesystem access.

use thiserror::Error;

/// Characters that are not allowed in stored file names
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum number of characters kept from a title when naming a file
pub const MAX_TITLE_CHARS: usize = 100;

/// Extension given to every stored document
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Path must not be empty")]
    EmptyPath,

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Result count must be a positive integer")]
    NonPositiveLimit,
}

/// Check that a URL is absolute and uses `http` or `https`.
///
/// Returns the trimmed URL.
pub fn validate_url(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::InvalidUrl(format!(
                "unsupported scheme: {}",
                other
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.to_string())
}

/// Derive the stored file name for a paper title.
///
/// Every character in [`FORBIDDEN_FILENAME_CHARS`] becomes `_`, the result is cut
/// to [`MAX_TITLE_CHARS`] characters and `.pdf` is appended.
pub fn format_filename(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let stem: String = title
        .chars()
        .map(|ch| {
            if FORBIDDEN_FILENAME_CHARS.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .take(MAX_TITLE_CHARS)
        .collect();

    Ok(format!("{}.{}", stem, DOCUMENT_EXTENSION))
}
