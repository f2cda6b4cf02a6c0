// src/config.rs
// =============================================================================
// Explicit configuration values.
//
// Nothing in the library reads the environment or keeps a process-wide
// setting: the binary turns CLI flags (and their env fallbacks) into these
// structs and hands them to the constructors that need them.
// =============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::fulltext::Backend;

/// Default per-request timeout for page fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before a fetch is reported as status 902.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Largest response body the fetcher will read (5 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_USER_AGENT: &str = concat!("readable-index/", env!("CARGO_PKG_VERSION"));

/// Settings for the fetcher.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Bodies larger than this are not read; the page reports status 901
    pub max_body_bytes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Where the bookmark database lives and which fulltext strategy to use.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Explicit override; when absent the backend is detected from `url`.
    pub backend: Option<Backend>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backend: None,
            max_connections: 5,
        }
    }

    /// Resolves the capability descriptor once, at startup.
    ///
    /// An explicit backend that disagrees with the URL scheme is refused
    /// rather than guessed around.
    pub fn backend(&self) -> Result<Backend> {
        let detected = Backend::from_url(&self.url);
        match (self.backend, detected) {
            (Some(chosen), Some(found)) if chosen != found => Err(Error::config(format!(
                "backend '{}' does not match database url scheme ('{}')",
                chosen, found
            ))),
            (Some(chosen), _) => Ok(chosen),
            (None, Some(found)) => Ok(found),
            (None, None) => Err(Error::config(format!(
                "cannot tell which fulltext backend to use for '{}'",
                self.url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_detected_from_url() {
        let config = DatabaseConfig::new("postgres://bookie@localhost/bookie");
        assert_eq!(config.backend().unwrap(), Backend::Postgres);
    }

    #[test]
    fn test_backend_override_must_match_scheme() {
        let mut config = DatabaseConfig::new("sqlite::memory:");
        config.backend = Some(Backend::Mysql);
        assert!(matches!(config.backend(), Err(Error::Configuration(_))));

        config.backend = Some(Backend::Sqlite);
        assert_eq!(config.backend().unwrap(), Backend::Sqlite);
    }

    #[test]
    fn test_unknown_scheme_is_a_configuration_error() {
        let config = DatabaseConfig::new("oracle://somewhere");
        assert!(matches!(config.backend(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_reader_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("readable-index/"));
        assert_eq!(config.max_body_bytes, 5 * 1024 * 1024);
    }
}
