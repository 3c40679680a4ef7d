//! Venue to rank lookup table loaded from a YAML resource.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;

use super::RankingError;

#[derive(Debug, Deserialize)]
struct RankingFile {
    venues: Vec<Value>,
}

/// One row of the ranking resource
#[derive(Debug, Clone, Default)]
pub struct RankingEntry {
    pub rank: Option<String>,
    pub abbr: Option<String>,
    pub name: Option<String>,
}

/// Lower-cased abbreviation and full name, both mapped to the rank
#[derive(Debug, Clone, Default)]
pub struct RankingTable {
    ranks: HashMap<String, String>,
}

impl RankingEntry {
    /// Read one `venues` row; scalar fields of any type are taken as text
    fn from_row(row: &Value) -> Option<Self> {
        let row = row.as_mapping()?;
        let field = |name: &str| row.get(name).and_then(scalar_text);
        Some(Self {
            rank: field("rank"),
            abbr: field("abbr"),
            name: field("name"),
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn key(text: &str) -> String {
    text.trim().to_lowercase()
}

impl RankingTable {
    /// Build from entries. A later entry overwrites an earlier one on key collision.
    pub fn from_entries(entries: impl IntoIterator<Item = RankingEntry>) -> Self {
        let mut ranks = HashMap::new();
        for entry in entries {
            let Some(rank) = entry.rank else {
                continue;
            };
            for name in [entry.abbr.as_deref(), entry.name.as_deref()]
                .into_iter()
                .flatten()
            {
                let name = key(name);
                if !name.is_empty() {
                    ranks.insert(name, rank.clone());
                }
            }
        }
        Self { ranks }
    }

    /// Parse a `venues:` document. Rows that are not mappings are skipped
    /// with a warning; the rest of the table still loads.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RankingError> {
        let file: RankingFile =
            serde_yaml::from_str(yaml).map_err(|e| RankingError::Malformed(e.to_string()))?;

        let entries = file
            .venues
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let entry = RankingEntry::from_row(row);
                if entry.is_none() {
                    tracing::warn!("Skipping ranking row {}: not a mapping", index);
                }
                entry
            })
            .collect::<Vec<_>>();
        Ok(Self::from_entries(entries))
    }

    /// Read and parse the resource, reporting why it could not be used
    pub fn try_load(path: &Path) -> Result<Self, RankingError> {
        let content = std::fs::read_to_string(path).map_err(|e| RankingError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Read the resource; a missing or malformed file gives an empty table
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(table) => {
                tracing::debug!("Loaded {} ranking keys from {}", table.len(), path.display());
                table
            }
            Err(e) => {
                tracing::warn!("Ranking table unavailable, no venue will be ranked: {}", e);
                Self::default()
            }
        }
    }

    /// Rank for a venue-like string, matched case-insensitively
    pub fn rank(&self, venue: &str) -> Option<&str> {
        self.ranks.get(&key(venue)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
