//! Core data models for paper records and search operations.

mod paper;
mod search;

pub use paper::{
    parse_timestamp, ErrorRecord, PaperCore, PaperRecord, PreprintRecord, Surface, VenueRecord,
};
pub use search::{PublicationInfo, SearchHit, SearchRequest, DEFAULT_VENUE, NO_RANK};
