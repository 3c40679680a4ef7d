//! In-process extraction with the PDF utilities.

use async_trait::async_trait;
use std::path::Path;

use super::{ExtractError, TextExtractor};
use crate::utils::extract_text;

/// Extracts text page by page on a blocking worker thread
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExtractor;

#[async_trait]
impl TextExtractor for LocalExtractor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_text(&owned))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))??;

        if text.trim().is_empty() {
            return Err(ExtractError::NoText(path.display().to_string()));
        }

        tracing::info!("Extracted {} characters from {}", text.len(), path.display());
        Ok(text)
    }
}
