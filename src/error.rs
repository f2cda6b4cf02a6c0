// src/error.rs
// =============================================================================
// Library-wide error type.
//
// Fetch and extraction problems never show up here: they are folded into a
// ReadResult status code (see readable::status). What is left are the errors
// a caller has to act on: bad configuration, a database that refused a write,
// or a bookmark row that does not exist.
// =============================================================================

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable fulltext backend, unknown backend name, or a query with
    /// nothing searchable in it.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("bookmark {0} does not exist")]
    MissingBookmark(i64),

    /// Only raised while building the HTTP client, never per fetch.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}
