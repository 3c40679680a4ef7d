//! Paper records produced by the search surfaces.
//!
//! The two surfaces disagree on what their time field means: the preprint
//! surface carries a full timestamp, the venue surface only a year taken from a
//! subject tag. Rather than one loosely-typed record, each surface gets its own
//! variant sharing [`PaperCore`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which remote listing a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// The preprint feed (arXiv mirror)
    Preprint,
    /// The conference/journal feed
    Venue,
}

impl Surface {
    /// Returns the display name of the surface
    pub fn name(&self) -> &'static str {
        match self {
            Surface::Preprint => "arXiv",
            Surface::Venue => "Venue",
        }
    }

    /// Returns the surface identifier (used in URLs and tool names)
    pub fn id(&self) -> &'static str {
        match self {
            Surface::Preprint => "arxiv",
            Surface::Venue => "venue",
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Fields every surface can provide
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperCore {
    /// Surface-specific opaque id. Only feed entries carry one.
    pub identifier: Option<String>,

    /// Paper title
    pub title: Option<String>,

    /// First author only
    pub author: Option<String>,

    /// Abstract text
    pub summary: Option<String>,

    /// Absolute URL of the document
    pub pdf_url: Option<String>,
}

/// A record from the preprint surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprintRecord {
    #[serde(flatten)]
    pub core: PaperCore,

    /// Full timestamp as published by the surface (e.g. `2024-01-22 18:59:56 UTC`)
    pub published: Option<String>,
}

/// A record from the venue surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    #[serde(flatten)]
    pub core: PaperCore,

    /// Four-digit year found in the subject tags (`NeurIPS.2023`)
    pub year: Option<i32>,

    /// Venue/track tags in document order
    #[serde(default)]
    pub subjects: Vec<String>,

    /// Feed timestamp, only present for feed-sourced entries
    pub updated: Option<String>,
}

/// Placeholder standing in for an entry or a whole listing that failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

/// One discovered paper, or a placeholder for one that could not be produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaperRecord {
    Preprint(PreprintRecord),
    Venue(VenueRecord),
    Error(ErrorRecord),
}

impl PaperRecord {
    /// Create an error placeholder
    pub fn error(message: impl Into<String>) -> Self {
        PaperRecord::Error(ErrorRecord {
            error: message.into(),
        })
    }

    /// Shared fields, `None` for error placeholders
    pub fn core(&self) -> Option<&PaperCore> {
        match self {
            PaperRecord::Preprint(r) => Some(&r.core),
            PaperRecord::Venue(r) => Some(&r.core),
            PaperRecord::Error(_) => None,
        }
    }

    /// Mutable access to the shared fields
    pub fn core_mut(&mut self) -> Option<&mut PaperCore> {
        match self {
            PaperRecord::Preprint(r) => Some(&mut r.core),
            PaperRecord::Venue(r) => Some(&mut r.core),
            PaperRecord::Error(_) => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.core().and_then(|c| c.title.as_deref())
    }

    pub fn author(&self) -> Option<&str> {
        self.core().and_then(|c| c.author.as_deref())
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.core().and_then(|c| c.pdf_url.as_deref())
    }

    /// The error message if this is a placeholder
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PaperRecord::Error(e) => Some(&e.error),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PaperRecord::Error(_))
    }

    /// Point in time used for chronological ordering.
    ///
    /// `None` when the record has no time or it cannot be parsed; such records
    /// sort after every dated record.
    pub fn sort_key(&self) -> Option<NaiveDateTime> {
        match self {
            PaperRecord::Preprint(r) => r.published.as_deref().and_then(parse_timestamp),
            PaperRecord::Venue(r) => r
                .updated
                .as_deref()
                .and_then(parse_timestamp)
                .or_else(|| r.year.and_then(start_of_year)),
            PaperRecord::Error(_) => None,
        }
    }

    /// Derived cross-surface key: md5 of the lower-cased title and first author.
    ///
    /// Not serialized; records without a title have no fingerprint.
    pub fn fingerprint(&self) -> Option<String> {
        let title = self.title()?.trim().to_lowercase();
        let author = self.author().unwrap_or_default().trim().to_lowercase();
        let digest = md5::compute(format!("{}\u{1f}{}", title, author));
        Some(format!("{:x}", digest))
    }
}

fn start_of_year(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse the time formats the surfaces are known to emit.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` with an optional trailing zone
/// label, a bare date, and a bare four-digit year.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    // "2024-01-22 18:59:56 UTC" -> drop the zone label
    let without_zone = raw
        .strip_suffix("UTC")
        .or_else(|| raw.strip_suffix("GMT"))
        .map(str::trim_end)
        .unwrap_or(raw);

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(without_zone, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(without_zone, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    if without_zone.len() == 4 {
        if let Ok(year) = without_zone.parse::<i32>() {
            return start_of_year(year);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprint(title: &str, published: Option<&str>) -> PaperRecord {
        PaperRecord::Preprint(PreprintRecord {
            core: PaperCore {
                title: Some(title.to_string()),
                ..Default::default()
            },
            published: published.map(String::from),
        })
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-22T18:59:56Z").is_some());
        assert!(parse_timestamp("2024-01-22T18:59:56+08:00").is_some());
        assert!(parse_timestamp("2024-01-22 18:59:56 UTC").is_some());
        assert!(parse_timestamp("2024-01-22").is_some());
        assert_eq!(
            parse_timestamp("2001"),
            NaiveDate::from_ymd_opt(2001, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_sort_key_per_variant() {
        let venue = PaperRecord::Venue(VenueRecord {
            year: Some(2023),
            ..Default::default()
        });
        assert_eq!(venue.sort_key(), start_of_year(2023));

        assert!(preprint("a", Some("2024-05-01")).sort_key().is_some());
        assert!(preprint("a", None).sort_key().is_none());
        assert!(PaperRecord::error("boom").sort_key().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(preprint("Title", Some("2024-01-01"))).unwrap();
        assert_eq!(value["kind"], "preprint");
        assert_eq!(value["title"], "Title");
        assert_eq!(value["published"], "2024-01-01");

        let value = serde_json::to_value(PaperRecord::error("network down")).unwrap();
        assert_eq!(value["kind"], "error");
        assert_eq!(value["error"], "network down");
    }

    #[test]
    fn test_fingerprint_ignores_case() {
        let a = preprint("Attention Is All You Need", None);
        let b = preprint("attention is all you need", None);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(PaperRecord::error("x").fingerprint().is_none());
    }
}
