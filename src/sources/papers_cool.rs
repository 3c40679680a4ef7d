//! Search orchestrator over the papers.cool preprint and venue surfaces.
//!
//! Each search fetches the listing for the query, normalizes it, optionally
//! sorts newest first, truncates, then enriches the surviving records. The
//! public [`PapersCoolSource::search`] never fails: any error becomes a single
//! error record.

use crate::config::EndpointConfig;
use crate::models::{PaperRecord, SearchHit, SearchRequest, Surface};
use crate::sources::{extract_pdf_link, normalize, DblpClient, SourceError};
use crate::utils::{ensure_success, validate_url, HttpClient, ValidationError};

/// Reject requests that cannot produce results, before any I/O
pub fn validate_request(request: &SearchRequest) -> Result<(), ValidationError> {
    if request.query.trim().is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    if request.max_results == 0 {
        return Err(ValidationError::NonPositiveLimit);
    }
    Ok(())
}

/// Optionally sort newest first, then keep the first `limit` records.
///
/// The sort is stable and undated records go last. Truncation always happens
/// after sorting.
pub fn sort_and_truncate(
    mut records: Vec<PaperRecord>,
    sort_by_time: bool,
    limit: usize,
) -> Vec<PaperRecord> {
    if sort_by_time {
        // Option orders None below Some, so reversing puts undated records last
        records.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    }
    records.truncate(limit);
    records
}

/// Client for the two papers.cool search surfaces
#[derive(Debug, Clone)]
pub struct PapersCoolSource {
    client: HttpClient,
    preprint_url: String,
    venue_url: String,
    dblp: DblpClient,
}

impl PapersCoolSource {
    pub fn new(client: HttpClient, endpoints: &EndpointConfig, dblp: DblpClient) -> Self {
        Self {
            client,
            preprint_url: endpoints.preprint_search.clone(),
            venue_url: endpoints.venue_search.clone(),
            dblp,
        }
    }

    /// Feed endpoint for a surface
    pub fn endpoint(&self, surface: Surface) -> &str {
        match surface {
            Surface::Preprint => &self.preprint_url,
            Surface::Venue => &self.venue_url,
        }
    }

    pub fn dblp(&self) -> &DblpClient {
        &self.dblp
    }

    /// Search one surface. Always returns a sequence; failures are reported
    /// as a single error record.
    pub async fn search(&self, surface: Surface, request: &SearchRequest) -> Vec<SearchHit> {
        match self.try_search(surface, request).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("{} search for '{}' failed: {}", surface, request.query, e);
                vec![SearchHit::from(PaperRecord::error(e.to_string()))]
            }
        }
    }

    async fn try_search(
        &self,
        surface: Surface,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, SourceError> {
        validate_request(request)?;

        let records = self.fetch_records(surface, request.query.trim()).await?;
        let total = records.len();
        let mut records = sort_and_truncate(records, request.sort_by_time, request.max_results);

        tracing::debug!(
            "{} search for '{}': {} records, {} kept",
            surface,
            request.query,
            total,
            records.len()
        );

        if request.with_pdf_link {
            self.fill_pdf_links(&mut records).await;
        }

        let mut hits = Vec::with_capacity(records.len());
        for record in records {
            let publication_info = if request.with_publication_info {
                self.lookup_publication(&record).await
            } else {
                None
            };
            hits.push(SearchHit {
                record,
                publication_info,
            });
        }

        Ok(hits)
    }

    /// Fetch and normalize the listing for `query`, in document order
    pub async fn fetch_records(
        &self,
        surface: Surface,
        query: &str,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        let url = self.endpoint(surface);
        tracing::debug!("GET {} query={}", url, query);

        let response = self.client.get(url).query(&[("query", query)]).send().await?;
        let body = ensure_success(response).await?.text().await?;

        Ok(normalize(&body, surface))
    }

    /// Fetch a paper page and pull the document URL out of it
    pub async fn resolve_pdf_link(&self, page_url: &str) -> Result<Option<String>, SourceError> {
        validate_url(page_url)?;
        tracing::debug!("Resolving PDF link from {}", page_url);

        let response = self.client.get(page_url).send().await?;
        let body = ensure_success(response).await?.text().await?;

        Ok(extract_pdf_link(&body))
    }

    async fn fill_pdf_links(&self, records: &mut [PaperRecord]) {
        for record in records.iter_mut() {
            let Some(core) = record.core_mut() else {
                continue;
            };
            if core.pdf_url.is_some() {
                continue;
            }
            let Some(page) = core
                .identifier
                .clone()
                .filter(|id| id.starts_with("http://") || id.starts_with("https://"))
            else {
                continue;
            };

            match self.resolve_pdf_link(&page).await {
                Ok(link) => core.pdf_url = link,
                Err(e) => tracing::warn!("Could not resolve PDF link for {}: {}", page, e),
            }
        }
    }

    async fn lookup_publication(
        &self,
        record: &PaperRecord,
    ) -> Option<crate::models::PublicationInfo> {
        let title = record.title()?;
        match self.dblp.publication_info(title, record.author()).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("Publication lookup failed for '{}': {}", title, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::models::{PaperCore, PreprintRecord};
    use crate::ranking::RankingResolver;
    use mockito::Matcher;

    fn source(server_url: &str, ranking: RankingResolver) -> PapersCoolSource {
        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let endpoints = EndpointConfig {
            preprint_search: format!("{}/arxiv/search/feed", server_url),
            venue_search: format!("{}/venue/search/feed", server_url),
            publication_search: format!("{}/search/publ/api", server_url),
        };
        let dblp = DblpClient::new(client.clone(), endpoints.publication_search.clone(), ranking);
        PapersCoolSource::new(client, &endpoints, dblp)
    }

    fn dated(title: &str, published: Option<&str>) -> PaperRecord {
        PaperRecord::Preprint(PreprintRecord {
            core: PaperCore {
                title: Some(title.to_string()),
                ..Default::default()
            },
            published: published.map(String::from),
        })
    }

    fn entry(title: &str, updated: Option<&str>) -> String {
        let updated = updated
            .map(|u| format!("<updated>{}</updated>", u))
            .unwrap_or_default();
        format!(
            "<entry><id>urn:{}</id><title>{}</title><author><name>A. Author</name></author>{}</entry>",
            title, title, updated
        )
    }

    fn feed(entries: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom">{}</feed>"#,
            entries.concat()
        )
    }

    #[test]
    fn test_validate_request() {
        assert_eq!(
            validate_request(&SearchRequest::new("  ")),
            Err(ValidationError::EmptyQuery)
        );
        assert_eq!(
            validate_request(&SearchRequest::new("llm").max_results(0)),
            Err(ValidationError::NonPositiveLimit)
        );
        assert!(validate_request(&SearchRequest::new("llm")).is_ok());
    }

    #[test]
    fn test_sort_then_truncate() {
        let records = vec![
            dated("old", Some("2001-01-01T00:00:00Z")),
            dated("new", Some("2024-05-01T00:00:00Z")),
            dated("undated", None),
        ];
        let kept = sort_and_truncate(records, true, 2);
        let titles: Vec<_> = kept.iter().filter_map(|r| r.title()).collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[test]
    fn test_sort_is_stable_and_undated_last() {
        let records = vec![
            dated("a", None),
            dated("b", Some("2020-01-01")),
            dated("c", None),
            dated("d", Some("2020-01-01")),
        ];
        let kept = sort_and_truncate(records, true, 10);
        let titles: Vec<_> = kept.iter().filter_map(|r| r.title()).collect();
        assert_eq!(titles, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_truncate_without_sort_keeps_document_order() {
        let records = vec![dated("x", None), dated("y", Some("2024-01-01")), dated("z", None)];
        let kept = sort_and_truncate(records, false, 2);
        let titles: Vec<_> = kept.iter().filter_map(|r| r.title()).collect();
        assert_eq!(titles, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_search_sorts_before_truncating() {
        let mut server = mockito::Server::new_async().await;
        let body = feed(&[
            entry("old", Some("2001-03-04T00:00:00Z")),
            entry("new", Some("2024-03-04T00:00:00Z")),
            entry("nodate", None),
        ]);
        let _mock = server
            .mock("GET", "/arxiv/search/feed")
            .match_query(Matcher::UrlEncoded("query".into(), "graph neural networks".into()))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(body)
            .create_async()
            .await;

        let src = source(&server.url(), RankingResolver::new("/nonexistent.yml"));
        let request = SearchRequest::new("graph neural networks")
            .max_results(2)
            .sort_by_time(true)
            .with_pdf_link(false);
        let hits = src.search(Surface::Preprint, &request).await;

        let titles: Vec<_> = hits.iter().filter_map(|h| h.record.title()).collect();
        assert_eq!(titles, vec!["new", "old"]);
        assert!(hits.iter().all(|h| h.publication_info.is_none()));
    }

    #[tokio::test]
    async fn test_search_fills_pdf_link_from_paper_page() {
        let mut server = mockito::Server::new_async().await;
        let page_url = format!("{}/arxiv/2401.00001", server.url());
        let body = format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>{}</id><title>Paged</title></entry></feed>"#,
            page_url
        );
        let _feed = server
            .mock("GET", "/venue/search/feed")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let _page = server
            .mock("GET", "/arxiv/2401.00001")
            .with_status(200)
            .with_body(r#"<a href="/pdf?url=https://arxiv.org/pdf/2401.00001">PDF</a>"#)
            .create_async()
            .await;

        let src = source(&server.url(), RankingResolver::new("/nonexistent.yml"));
        let hits = src.search(Surface::Venue, &SearchRequest::new("paged")).await;

        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].record.pdf_url(),
            Some("https://arxiv.org/pdf/2401.00001")
        );
    }

    #[tokio::test]
    async fn test_search_attaches_publication_info() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let ranking_path = dir.path().join("ccfrank.yml");
        std::fs::write(&ranking_path, "venues:\n  - {rank: A, abbr: ICML}\n").unwrap();

        let _feed = server
            .mock("GET", "/arxiv/search/feed")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(feed(&[entry("Ranked", Some("2023-01-01T00:00:00Z"))]))
            .create_async()
            .await;
        let _dblp = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result":{"hits":{"@total":"1","hit":[{"info":{"venue":"ICML","year":"2023"}}]}}}"#)
            .create_async()
            .await;

        let src = source(&server.url(), RankingResolver::new(ranking_path));
        let request = SearchRequest::new("ranked")
            .with_pdf_link(false)
            .with_publication_info(true);
        let hits = src.search(Surface::Preprint, &request).await;

        let info = hits[0].publication_info.as_ref().unwrap();
        assert_eq!(info.venue, "ICML");
        assert_eq!(info.ccf_rank, "A");
    }

    #[tokio::test]
    async fn test_status_error_becomes_single_error_record() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/arxiv/search/feed")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream overloaded")
            .create_async()
            .await;

        let src = source(&server.url(), RankingResolver::new("/nonexistent.yml"));
        let hits = src.search(Surface::Preprint, &SearchRequest::new("x")).await;

        assert_eq!(hits.len(), 1);
        let message = hits[0].record.error_message().unwrap();
        assert!(message.contains("503"));
        assert!(message.contains("upstream overloaded"));
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let src = source(&server.url(), RankingResolver::new("/nonexistent.yml"));
        let hits = src.search(Surface::Venue, &SearchRequest::new("")).await;

        assert_eq!(hits.len(), 1);
        assert!(hits[0].record.error_message().unwrap().starts_with("Invalid request"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_error_record() {
        let src = source("http://127.0.0.1:1", RankingResolver::new("/nonexistent.yml"));
        let hits = src.search(Surface::Preprint, &SearchRequest::new("x")).await;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].record.is_error());
    }

    #[tokio::test]
    async fn test_resolve_pdf_link_rejects_non_http() {
        let src = source("http://127.0.0.1:1", RankingResolver::new("/nonexistent.yml"));
        let err = src.resolve_pdf_link("ftp://example.org/paper").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }
}
