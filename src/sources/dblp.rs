//! DBLP publication lookup.
//!
//! Uses the DBLP JSON search API to find where a paper was published, then
//! resolves that venue against the CCF ranking table.

use serde::Deserialize;
use serde_json::Value;

use crate::models::PublicationInfo;
use crate::ranking::{enrich_publication, RankingResolver};
use crate::sources::SourceError;
use crate::utils::{ensure_success, HttpClient};

#[derive(Debug, Deserialize)]
struct DblpResponse {
    result: Option<DblpResult>,
}

#[derive(Debug, Deserialize)]
struct DblpResult {
    hits: Option<DblpHits>,
}

#[derive(Debug, Deserialize)]
struct DblpHits {
    #[serde(rename = "@total", default)]
    total: Option<String>,
    #[serde(default)]
    hit: Vec<DblpHit>,
}

#[derive(Debug, Deserialize)]
struct DblpHit {
    info: Option<DblpInfo>,
}

// DBLP emits a list when a record has several values
#[derive(Debug, Deserialize)]
struct DblpInfo {
    venue: Option<Value>,
    journal: Option<Value>,
    booktitle: Option<Value>,
    year: Option<Value>,
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

/// Lookup client for the DBLP publication search endpoint
#[derive(Debug, Clone)]
pub struct DblpClient {
    client: HttpClient,
    search_url: String,
    ranking: RankingResolver,
}

impl DblpClient {
    pub fn new(client: HttpClient, search_url: impl Into<String>, ranking: RankingResolver) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            ranking,
        }
    }

    /// Venue and CCF rank of the best match for `title`.
    ///
    /// No match gives the default record (`arxiv`, no rank).
    pub async fn publication_info(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<PublicationInfo, SourceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SourceError::InvalidRequest(
                "Title must not be empty".to_string(),
            ));
        }

        let mut query = title.to_string();
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            query.push_str(" author:");
            query.push_str(author);
        }

        tracing::debug!("DBLP lookup: {}", query);

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str()), ("format", "json")])
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        let data: DblpResponse = serde_json::from_str(&body)?;

        let info = data
            .result
            .and_then(|r| r.hits)
            .filter(|hits| hits.total.as_deref() != Some("0"))
            .and_then(|hits| hits.hit.into_iter().next())
            .and_then(|hit| hit.info);

        let Some(info) = info else {
            tracing::debug!("No DBLP match for '{}'", title);
            return Ok(PublicationInfo::default());
        };

        let table = self.ranking.table();
        let venue = info.venue.as_ref().and_then(first_text);
        let journal = info.journal.as_ref().and_then(first_text);
        let booktitle = info.booktitle.as_ref().and_then(first_text);
        let year = info.year.as_ref().and_then(first_text);

        Ok(enrich_publication(
            &table,
            venue.as_deref(),
            journal.as_deref(),
            booktitle.as_deref(),
            year.as_deref(),
        ))
    }
}
