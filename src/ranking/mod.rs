//! CCF ranking resolution.
//!
//! The ranking resource is re-read on every call so edits to it take effect
//! without a restart. A resource that cannot be read resolves every venue to
//! the no-rank sentinel.

mod table;

pub use table::{RankingEntry, RankingTable};

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::PublicationInfo;

/// Returned by [`RankingResolver::resolve`] for a venue that is not in the table
pub const UNKNOWN_RANK: &str = "N/A";

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Venue name must not be empty")]
    EmptyVenue,

    #[error("Cannot read ranking file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed ranking file: {0}")]
    Malformed(String),
}

/// Resolves venue names against the ranking resource at `path`
#[derive(Debug, Clone)]
pub struct RankingResolver {
    path: PathBuf,
}

impl RankingResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a fresh copy of the table
    pub fn table(&self) -> RankingTable {
        RankingTable::load(&self.path)
    }

    /// Rank of a venue, or [`UNKNOWN_RANK`]. Blank input is rejected.
    pub fn resolve(&self, venue: &str) -> Result<String, RankingError> {
        if venue.trim().is_empty() {
            return Err(RankingError::EmptyVenue);
        }
        Ok(self
            .table()
            .rank(venue)
            .unwrap_or(UNKNOWN_RANK)
            .to_string())
    }
}

/// Build the enrichment record for one bibliographic hit.
///
/// The venue sets the base rank. A ranked journal overrides it, and a ranked
/// booktitle overrides both. Journal and booktitle are only recorded when
/// they resolved.
pub fn enrich_publication(
    table: &RankingTable,
    venue: Option<&str>,
    journal: Option<&str>,
    booktitle: Option<&str>,
    year: Option<&str>,
) -> PublicationInfo {
    let mut info = PublicationInfo::default();

    if let Some(venue) = venue.filter(|v| !v.trim().is_empty()) {
        info.venue = venue.to_string();
        if let Some(rank) = table.rank(venue) {
            info.ccf_rank = rank.to_string();
        }
    }

    if let Some(journal) = journal {
        if let Some(rank) = table.rank(journal) {
            info.ccf_rank = rank.to_string();
            info.journal = Some(journal.to_string());
        }
    }

    if let Some(booktitle) = booktitle {
        if let Some(rank) = table.rank(booktitle) {
            info.ccf_rank = rank.to_string();
            info.booktitle = Some(booktitle.to_string());
        }
    }

    info.year = year.map(str::to_string);
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_VENUE, NO_RANK};

    fn table() -> RankingTable {
        RankingTable::from_yaml_str(
            r#"
venues:
  - rank: A
    abbr: nips
    name: neural information processing systems
  - rank: B
    abbr: TNNLS
    name: IEEE Transactions on Neural Networks and Learning Systems
  - rank: C
    abbr: ICONIP
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolver_reads_file_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ccfrank.yml");
        let resolver = RankingResolver::new(&path);

        assert_eq!(resolver.resolve("NIPS").unwrap(), UNKNOWN_RANK);

        std::fs::write(&path, "venues:\n  - {rank: A, abbr: nips, name: neural information processing systems}\n").unwrap();
        assert_eq!(resolver.resolve("NIPS").unwrap(), "A");
        assert_eq!(
            resolver
                .resolve("Neural Information Processing Systems")
                .unwrap(),
            "A"
        );
        assert_eq!(resolver.resolve("Unknown Workshop").unwrap(), UNKNOWN_RANK);
    }

    #[test]
    fn test_resolver_rejects_blank_input() {
        let resolver = RankingResolver::new("/nonexistent/ccfrank.yml");
        assert!(matches!(resolver.resolve("   "), Err(RankingError::EmptyVenue)));
        assert!(matches!(resolver.resolve(""), Err(RankingError::EmptyVenue)));
    }

    #[test]
    fn test_enrich_defaults() {
        let info = enrich_publication(&table(), None, None, None, None);
        assert_eq!(info.venue, DEFAULT_VENUE);
        assert_eq!(info.ccf_rank, NO_RANK);
        assert!(!info.is_ranked());
    }

    #[test]
    fn test_booktitle_overrides_venue() {
        let info = enrich_publication(&table(), Some("NIPS"), None, Some("ICONIP"), Some("2023"));
        assert_eq!(info.venue, "NIPS");
        assert_eq!(info.ccf_rank, "C");
        assert_eq!(info.booktitle.as_deref(), Some("ICONIP"));
        assert_eq!(info.year.as_deref(), Some("2023"));
    }

    #[test]
    fn test_booktitle_wins_over_journal() {
        let info = enrich_publication(
            &table(),
            Some("Unranked Venue"),
            Some("TNNLS"),
            Some("NIPS"),
            None,
        );
        assert_eq!(info.ccf_rank, "A");
        assert_eq!(info.journal.as_deref(), Some("TNNLS"));
        assert_eq!(info.booktitle.as_deref(), Some("NIPS"));
    }

    #[test]
    fn test_unranked_journal_is_not_recorded() {
        let info = enrich_publication(&table(), Some("TNNLS"), Some("Some Letters"), None, None);
        assert_eq!(info.ccf_rank, "B");
        assert!(info.journal.is_none());
    }
}
