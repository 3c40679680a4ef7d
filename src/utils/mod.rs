//! Utility modules shared by the search, storage and extraction layers.
//!
//! - [`HttpClient`]: shared reqwest client built from the `[http]` config section
//! - [`ensure_success`]: map non-2xx responses to a status error with a body excerpt
//! - [`extract_text`] / [`extract_pages`]: local PDF text extraction
//! - [`validate_url`] / [`format_filename`]: input validation done before any I/O

mod http;
mod pdf;
mod validate;

pub use http::{ensure_success, excerpt, HttpClient};
pub use pdf::{extract_pages, extract_text, PdfExtractError};
pub use validate::{
    format_filename, validate_url, ValidationError, DOCUMENT_EXTENSION,
    FORBIDDEN_FILENAME_CHARS, MAX_TITLE_CHARS,
};
