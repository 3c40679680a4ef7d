//! Tool handlers.
//!
//! Every handler answers with a value in the shape of a success: searches
//! return a record sequence (possibly a single error record), everything else
//! returns its result or an `"Error: ..."` string. `Err` is reserved for
//! results that cannot be serialized.

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;

use super::query_plan::{plan, QueryPlanStep};
use super::tools::ToolHandler;
use crate::app::AppContext;
use crate::models::{PaperRecord, SearchHit, SearchRequest, Surface};

fn error_text(err: impl Display) -> Value {
    Value::String(format!("Error: {}", err))
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    str_arg(args, key).ok_or_else(|| format!("Missing '{}' parameter", key))
}

fn bool_arg(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// `search_on_arxiv` / `search_on_venue`
#[derive(Debug)]
pub struct SearchHandler {
    pub app: Arc<AppContext>,
    pub surface: Surface,
}

impl SearchHandler {
    fn request(args: &Value) -> Result<SearchRequest, String> {
        let query = required_str(args, "query")?;
        let defaults = SearchRequest::default();

        // negative counts fall through to validation as zero
        let max_results = match args.get("num_results").and_then(|v| v.as_i64()) {
            Some(n) => usize::try_from(n).unwrap_or(0),
            None => defaults.max_results,
        };

        Ok(SearchRequest::new(query)
            .max_results(max_results)
            .sort_by_time(bool_arg(args, "need_datetime_sort", defaults.sort_by_time))
            .with_pdf_link(bool_arg(args, "need_pdf_link", defaults.with_pdf_link))
            .with_publication_info(bool_arg(
                args,
                "need_publication_info",
                defaults.with_publication_info,
            )))
    }
}

#[async_trait::async_trait]
impl ToolHandler for SearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let hits = match Self::request(&args) {
            Ok(request) => self.app.search.search(self.surface, &request).await,
            Err(message) => vec![SearchHit::from(PaperRecord::error(message))],
        };
        to_value(&hits)
    }
}

/// `get_publication_info`
#[derive(Debug)]
pub struct PublicationInfoHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for PublicationInfoHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let title = match required_str(&args, "title") {
            Ok(title) => title,
            Err(e) => return Ok(error_text(e)),
        };
        let author = str_arg(&args, "author");

        match self.app.search.dblp().publication_info(title, author).await {
            Ok(info) => to_value(&info),
            Err(e) => Ok(error_text(e)),
        }
    }
}

/// `get_ccf_rank`
#[derive(Debug)]
pub struct CcfRankHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for CcfRankHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let venue = str_arg(&args, "venue").unwrap_or_default();
        Ok(match self.app.ranking.resolve(venue) {
            Ok(rank) => Value::String(rank),
            Err(e) => error_text(e),
        })
    }
}

/// `get_paper_pdf_link`
#[derive(Debug)]
pub struct PdfLinkHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for PdfLinkHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let page = match required_str(&args, "cool_paper_id") {
            Ok(page) => page,
            Err(e) => return Ok(error_text(e)),
        };

        Ok(match self.app.search.resolve_pdf_link(page).await {
            Ok(Some(link)) => Value::String(link),
            Ok(None) => Value::Null,
            Err(e) => error_text(e),
        })
    }
}

/// `download_paper_pdf`
#[derive(Debug)]
pub struct DownloadHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for DownloadHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let title = str_arg(&args, "title").unwrap_or_default();
        let url = str_arg(&args, "pdf_link").unwrap_or_default();

        Ok(match self.app.store.download(title, url).await {
            Ok(name) => Value::String(name),
            Err(e) => error_text(e),
        })
    }
}

/// `list_downloaded_papers`
#[derive(Debug)]
pub struct ListDownloadsHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for ListDownloadsHandler {
    async fn execute(&self, _args: Value) -> Result<Value, String> {
        match self.app.store.list().await {
            Ok(listing) => to_value(&listing),
            Err(e) => Ok(error_text(e)),
        }
    }
}

/// `extract_pdf_text`
#[derive(Debug)]
pub struct ExtractTextHandler {
    pub app: Arc<AppContext>,
}

#[async_trait::async_trait]
impl ToolHandler for ExtractTextHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let path = str_arg(&args, "pdf_path").unwrap_or_default();
        Ok(match self.app.extraction.extract(path).await {
            Ok(text) => Value::String(text),
            Err(e) => {
                tracing::warn!("Extraction of '{}' failed: {}", path, e);
                error_text(e)
            }
        })
    }
}

/// `extract_academic_query`
#[derive(Debug)]
pub struct QueryPlanHandler;

#[async_trait::async_trait]
impl ToolHandler for QueryPlanHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        Ok(match serde_json::from_value::<QueryPlanStep>(args) {
            Ok(step) => plan(&step),
            Err(e) => error_text(format!("Invalid arguments: {}", e)),
        })
    }
}
