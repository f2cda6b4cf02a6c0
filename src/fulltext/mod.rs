// src/fulltext/mod.rs
// =============================================================================
// Full-text indexing across three relational engines.
//
// Each engine has its own native primitive:
// - SQLite: an fts5 virtual table kept next to the bookmark table
// - MySQL: FULLTEXT indexes directly on the bookmark columns
// - PostgreSQL: one GIN index per to_tsvector() expression
//
// The rest of the crate only sees the FulltextIndex trait. Which
// implementation is behind it is decided once, from DatabaseConfig, in
// connect(); nothing else branches on the engine.
//
// Submodules:
// - query: scopes, requests and term normalisation
// - tags: the derived tag string
// - search: the SearchGateway callers query through
// - sqlite / mysql / postgres: the three strategies
// =============================================================================

mod mysql;
mod postgres;
mod query;
mod search;
mod sqlite;
mod tags;

pub use mysql::MysqlFulltext;
pub use postgres::PostgresFulltext;
pub use query::{is_stopword, terms, FulltextQuery, SearchField, SearchRequest, SearchScope, STOPWORDS};
pub use search::SearchGateway;
pub use sqlite::SqliteFulltext;
pub use tags::TagString;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::readable::ReadResult;

/// Which fulltext strategy is active for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded virtual full-text table
    Sqlite,
    /// Native FULLTEXT column indexes
    Mysql,
    /// Per-expression tsvector GIN indexes
    Postgres,
}

impl Backend {
    /// Detects the backend from a database url scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Some(Backend::Sqlite),
            "mysql" | "mariadb" => Some(Backend::Mysql),
            "postgres" | "postgresql" => Some(Backend::Postgres),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            "mysql" | "mariadb" => Ok(Backend::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Backend::Postgres),
            other => Err(Error::config(format!("unknown fulltext backend '{}'", other))),
        }
    }
}

/// The searchable projection of one bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchableRecord {
    pub bid: i64,
    pub description: String,
    pub extended: String,
    pub tag_string: TagString,
    pub content: Option<String>,
}

impl SearchableRecord {
    pub fn new(bid: i64, description: impl Into<String>, extended: impl Into<String>) -> Self {
        Self {
            bid,
            description: description.into(),
            extended: extended.into(),
            tag_string: TagString::default(),
            content: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tag_string = TagString::from_tags(tags);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// One fulltext strategy.
///
/// Every write is a single transaction scoped to one bookmark, so readers
/// never see a half-updated record. Failures are returned, never retried.
#[async_trait]
pub trait FulltextIndex: Send + Sync {
    fn backend(&self) -> Backend;

    /// Adds `bmarks.tag_str`, the `readable` table and the fulltext
    /// structures. Safe to run more than once.
    async fn install(&self) -> Result<()>;

    /// Removes what `install` added.
    async fn uninstall(&self) -> Result<()>;

    /// Writes description, notes, tags and content for one bookmark.
    async fn index(&self, record: &SearchableRecord) -> Result<()>;

    /// Re-derives the tag string after the bookmark's tag set changed.
    async fn update_tags(&self, bid: i64, tags: &TagString) -> Result<()>;

    /// Persists a read attempt next to the bookmark and indexes its content.
    async fn store_readable(&self, bid: i64, read: &ReadResult) -> Result<()>;

    /// Drops a deleted bookmark from the search surface.
    async fn remove(&self, bid: i64) -> Result<()>;

    /// Matching bookmark ids in the backend's relevance order.
    async fn search(&self, query: &FulltextQuery) -> Result<Vec<i64>>;
}

/// Opens the strategy chosen by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn FulltextIndex>> {
    let backend = config.backend()?;
    info!(%backend, "connecting fulltext backend");

    let index: Arc<dyn FulltextIndex> = match backend {
        Backend::Sqlite => Arc::new(SqliteFulltext::connect(config).await?),
        Backend::Mysql => Arc::new(MysqlFulltext::connect(config).await?),
        Backend::Postgres => Arc::new(PostgresFulltext::connect(config).await?),
    };
    Ok(index)
}

// Numeric limit/offset rendered straight into SQL; both are integers so
// there is nothing to escape.
pub(crate) fn limit_clause(query: &FulltextQuery, unlimited: &str) -> String {
    let limit = query
        .limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| unlimited.to_string());
    format!("LIMIT {} OFFSET {}", limit, query.offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("sqlite://bookie.db"), Some(Backend::Sqlite));
        assert_eq!(Backend::from_url("sqlite::memory:"), Some(Backend::Sqlite));
        assert_eq!(Backend::from_url("mysql://u:p@h/db"), Some(Backend::Mysql));
        assert_eq!(Backend::from_url("postgresql://h/db"), Some(Backend::Postgres));
        assert_eq!(Backend::from_url("redis://h"), None);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("PG".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert!(matches!(
            "oracle".parse::<Backend>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_record_builder() {
        let record = SearchableRecord::new(7, "desc", "notes")
            .with_tags(["search", "python"])
            .with_content("body");
        assert_eq!(record.tag_string.as_str(), "python search");
        assert_eq!(record.content.as_deref(), Some("body"));
    }

    #[test]
    fn test_limit_clause() {
        let request = SearchRequest::new("x", SearchScope::All);
        let query = FulltextQuery::parse(&request).unwrap();
        assert_eq!(limit_clause(&query, "-1"), "LIMIT -1 OFFSET 0");

        let query = FulltextQuery::parse(&request.page(5, 10)).unwrap();
        assert_eq!(limit_clause(&query, "ALL"), "LIMIT 5 OFFSET 10");
    }
}
