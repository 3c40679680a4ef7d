//! Search request and enrichment models.

use serde::{Deserialize, Serialize};

/// Search parameters for one surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Single phrase; boolean operators are not supported by the surfaces
    pub query: String,

    /// Maximum number of records to return
    pub max_results: usize,

    /// Sort newest first before truncating
    pub sort_by_time: bool,

    /// Fill in missing PDF links from the paper page
    pub with_pdf_link: bool,

    /// Attach DBLP venue and CCF rank to each record
    pub with_publication_info: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: 100,
            sort_by_time: false,
            with_pdf_link: true,
            with_publication_info: false,
        }
    }
}

impl SearchRequest {
    /// Create a new search request
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Enable/disable chronological sorting
    pub fn sort_by_time(mut self, sort: bool) -> Self {
        self.sort_by_time = sort;
        self
    }

    /// Enable/disable PDF link resolution
    pub fn with_pdf_link(mut self, enabled: bool) -> Self {
        self.with_pdf_link = enabled;
        self
    }

    /// Enable/disable publication info enrichment
    pub fn with_publication_info(mut self, enabled: bool) -> Self {
        self.with_publication_info = enabled;
        self
    }
}

/// Rank label used when nothing matched
pub const NO_RANK: &str = "None";

/// Venue used when the lookup found no publication
pub const DEFAULT_VENUE: &str = "arxiv";

/// Venue and quality tier of a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    pub venue: String,

    pub ccf_rank: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub booktitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Default for PublicationInfo {
    fn default() -> Self {
        Self {
            venue: DEFAULT_VENUE.to_string(),
            ccf_rank: NO_RANK.to_string(),
            journal: None,
            booktitle: None,
            year: None,
        }
    }
}

impl PublicationInfo {
    /// Whether any rank was resolved
    pub fn is_ranked(&self) -> bool {
        self.ccf_rank != NO_RANK
    }
}

/// A record together with its optional enrichment, as returned by searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: super::PaperRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_info: Option<PublicationInfo>,
}

impl From<super::PaperRecord> for SearchHit {
    fn from(record: super::PaperRecord) -> Self {
        Self {
            record,
            publication_info: None,
        }
    }
}
