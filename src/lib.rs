// src/lib.rs
// =============================================================================
// readable-index: fetch the page behind a bookmark, pull out its readable
// text, and keep that text searchable next to the bookmark's description,
// notes and tags on SQLite, MySQL or PostgreSQL.
//
// Modules:
// - readable: fetching, status codes, readability extraction, ReadResult
// - fulltext: backend descriptor, the three index strategies, search gateway
// - ingest: the save workflow tying the two together
// - config / error: explicit settings and the library error type
// =============================================================================

pub mod config;
pub mod error;
pub mod fulltext;
pub mod ingest;
pub mod readable;

pub use config::{DatabaseConfig, ReaderConfig};
pub use error::{Error, Result};
pub use fulltext::{
    Backend, FulltextIndex, SearchGateway, SearchRequest, SearchScope, SearchableRecord, TagString,
};
pub use readable::{read_content, ReadResult, ReadStatus, Reader};
