//! # ScholAI
//!
//! A Model Context Protocol (MCP) server for discovering academic papers,
//! ranking their venues, downloading them and extracting their text.
//!
//! ## Architecture
//!
//! - [`models`]: paper records (one variant per search surface), search requests, enrichment
//! - [`sources`]: feed/listing normalization, PDF link extraction, the search orchestrator, DBLP lookup
//! - [`ranking`]: CCF venue ranking
//! - [`storage`]: downloading and listing stored documents
//! - [`extract`]: local and remote text extraction, including the remote parsing job
//! - [`mcp`]: MCP tool registry and stdio server
//! - [`utils`]: HTTP client, validation, PDF text utilities
//! - [`config`]: layered configuration

pub mod app;
pub mod config;
pub mod extract;
pub mod mcp;
pub mod models;
pub mod ranking;
pub mod sources;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use app::AppContext;
pub use models::{PaperRecord, SearchHit, SearchRequest, Surface};
pub use sources::{PapersCoolSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
