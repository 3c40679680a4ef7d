//! Wiring of the services behind every caller-facing operation.

use crate::config::Config;
use crate::extract::ExtractionOrchestrator;
use crate::ranking::RankingResolver;
use crate::sources::{DblpClient, PapersCoolSource, SourceError};
use crate::storage::ArtifactStore;
use crate::utils::HttpClient;

/// Everything the tools and CLI commands need, built once at startup
#[derive(Debug, Clone)]
pub struct AppContext {
    pub search: PapersCoolSource,
    pub ranking: RankingResolver,
    pub store: ArtifactStore,
    pub extraction: ExtractionOrchestrator,
}

impl AppContext {
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::new(&config.http)?;
        let ranking = RankingResolver::new(&config.ranking.path);

        let dblp = DblpClient::new(
            client.clone(),
            config.endpoints.publication_search.clone(),
            ranking.clone(),
        );
        let search = PapersCoolSource::new(client.clone(), &config.endpoints, dblp);
        let store = ArtifactStore::new(&config.storage.data_dir, client.clone());
        let extraction = ExtractionOrchestrator::from_config(&config.parser, store.clone(), client);

        Ok(Self {
            search,
            ranking,
            store,
            extraction,
        })
    }
}
