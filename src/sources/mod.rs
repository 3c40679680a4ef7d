//! Remote paper surfaces and the parsing that turns them into records.
//!
//! - [`links`]: ordered fallback rules that pull a document URL out of markup
//! - [`normalize`]: Atom feed / HTML listing to [`PaperRecord`](crate::models::PaperRecord)
//! - [`PapersCoolSource`]: the search orchestrator over the preprint and venue surfaces
//! - [`DblpClient`]: bibliographic lookup used for publication info
//!
//! Every remote call reports failures through [`SourceError`]. The orchestrator
//! turns those into error records at its boundary so callers always receive a
//! sequence.

mod dblp;
pub mod links;
pub mod normalize;
mod papers_cool;

pub use dblp::DblpClient;
pub use links::{extract_pdf_link, LinkRule};
pub use normalize::{detect_format, normalize, DocumentFormat};
pub use papers_cool::{sort_and_truncate, validate_request, PapersCoolSource};

use crate::utils::ValidationError;

/// Errors that can occur when interacting with a remote surface
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not finish in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-2xx response
    #[error("HTTP error {code}: {excerpt}")]
    Status { code: u16, excerpt: String },

    /// Parsing error (XML, JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Status {
                code: status.as_u16(),
                excerpt: err.to_string(),
            }
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

impl From<ValidationError> for SourceError {
    fn from(err: ValidationError) -> Self {
        SourceError::InvalidRequest(err.to_string())
    }
}
