//! Extraction orchestrator.
//!
//! Text comes either from local page-by-page extraction or from a remote
//! parsing service. The strategy is chosen once, when the orchestrator is
//! built, from whether a parser credential is configured.

mod local;
mod remote;

pub use local::LocalExtractor;
pub use remote::{
    run_job, JobStatus, LlamaParseClient, ParseJobError, ParseService, PollConfig,
    RemoteExtractor,
};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ParserConfig;
use crate::storage::{ArtifactStore, StorageError};
use crate::utils::{HttpClient, PdfExtractError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Path(#[from] StorageError),

    #[error("No text could be extracted from {0}")]
    NoText(String),

    #[error(transparent)]
    Pdf(#[from] PdfExtractError),

    #[error(transparent)]
    Remote(#[from] ParseJobError),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// A way of turning a stored document into text
#[async_trait]
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Resolves a document path and hands it to the configured strategy
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    store: ArtifactStore,
    extractor: Arc<dyn TextExtractor>,
}

impl ExtractionOrchestrator {
    pub fn new(store: ArtifactStore, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { store, extractor }
    }

    /// Remote parsing when `parser` carries a credential, local otherwise
    pub fn from_config(parser: &ParserConfig, store: ArtifactStore, client: HttpClient) -> Self {
        let extractor: Arc<dyn TextExtractor> = match parser.credential() {
            Some(key) => {
                let service = LlamaParseClient::new(client, &parser.base_url, key);
                Arc::new(RemoteExtractor::new(Arc::new(service), parser.poll_config()))
            }
            None => Arc::new(LocalExtractor),
        };
        tracing::debug!("Using {} text extraction", extractor.name());
        Self::new(store, extractor)
    }

    pub fn strategy(&self) -> &'static str {
        self.extractor.name()
    }

    /// Absolute, working-directory relative, then artifact-directory relative
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf, ExtractError> {
        Ok(self.store.resolve(raw)?)
    }

    pub async fn extract(&self, raw: &str) -> Result<String, ExtractError> {
        let path = self.resolve_path(raw)?;
        tracing::debug!("Extracting {} with {}", path.display(), self.extractor.name());
        self.extractor.extract(&path).await
    }
}
