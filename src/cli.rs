// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Connection and fetch settings are global flags with environment-variable
// fallbacks; main.rs turns them into ReaderConfig / DatabaseConfig values so
// the library never reads the environment itself.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use readable_index::config::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT};
use readable_index::{Backend, DatabaseConfig, ReaderConfig};

#[derive(Parser, Debug)]
#[command(
    name = "readable-index",
    version,
    about = "Fetch bookmarked pages, extract their readable text and search it",
    long_about = "readable-index fetches the page behind a bookmark, strips navigation and \
                  other clutter, stores the readable text next to the bookmark and keeps it \
                  full-text searchable on SQLite, MySQL or PostgreSQL."
)]
pub struct Cli {
    /// Database url (sqlite://, mysql:// or postgres://)
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Fulltext backend; detected from the database url when omitted
    #[arg(long, env = "READABLE_BACKEND", global = true)]
    pub backend: Option<Backend>,

    /// Per-request timeout for page fetches, in seconds
    #[arg(long, env = "READABLE_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub timeout_secs: u64,

    /// Redirect hops to follow before giving up (status 902)
    #[arg(long, env = "READABLE_MAX_REDIRECTS", default_value_t = DEFAULT_MAX_REDIRECTS, global = true)]
    pub max_redirects: usize,

    /// User-Agent header sent with every fetch
    #[arg(long, env = "READABLE_USER_AGENT", default_value = DEFAULT_USER_AGENT, global = true)]
    pub user_agent: String,

    /// Largest page body to download, in bytes
    #[arg(long, env = "READABLE_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES, global = true)]
    pub max_body_bytes: usize,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
            user_agent: self.user_agent.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// `None` when no database url was given at all.
    pub fn database_config(&self) -> Option<DatabaseConfig> {
        let url = self.database_url.as_ref()?;
        let mut config = DatabaseConfig::new(url.clone());
        config.backend = self.backend;
        Some(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL and print its readable text
    ///
    /// Example: readable-index read https://example.com/article
    Read {
        url: String,

        /// Output the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract readable text from a local HTML file (given-content mode)
    Parse {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Add the tag string column, readable table and fulltext structures
    Install,

    /// Remove what `install` added
    Uninstall,

    /// Read one bookmark's page (or a local file) and store it for search
    Ingest {
        /// Bookmark id
        bid: i64,

        /// Page to fetch
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        /// Use this HTML file instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Ingest many bookmarks from a file of "<bid> <url>" lines
    IngestBatch {
        list: PathBuf,

        /// How many bookmarks to fetch at once
        #[arg(long, default_value_t = readable_index::ingest::DEFAULT_CONCURRENCY)]
        concurrency: usize,

        #[arg(long)]
        json: bool,
    },

    /// Replace a bookmark's tags in the search surface
    Tag {
        bid: i64,

        /// The bookmark's complete tag set
        tags: Vec<String>,
    },

    /// Search bookmarks; prints matching ids
    Search {
        query: String,

        /// Also search extracted page content
        #[arg(long, conflicts_with = "tags_only")]
        content: bool,

        /// Only match against tags
        #[arg(long)]
        tags_only: bool,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_flags() {
        let cli = Cli::try_parse_from([
            "readable-index",
            "--database-url",
            "sqlite://bookie.db",
            "search",
            "python",
            "--content",
            "--limit",
            "5",
        ])
        .unwrap();

        let config = cli.database_config().unwrap();
        assert_eq!(config.backend().unwrap(), Backend::Sqlite);
        match cli.command {
            Commands::Search { query, content, limit, .. } => {
                assert_eq!(query, "python");
                assert!(content);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_ingest_needs_url_or_file() {
        assert!(Cli::try_parse_from(["readable-index", "ingest", "3"]).is_err());
        assert!(Cli::try_parse_from(["readable-index", "ingest", "3", "--file", "a.html"]).is_ok());
    }

    #[test]
    fn test_reader_config_from_flags() {
        let cli = Cli::try_parse_from(["readable-index", "--timeout-secs", "3", "read", "http://x"])
            .unwrap();
        assert_eq!(cli.reader_config().timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_max_body_bytes_flag() {
        let cli = Cli::try_parse_from([
            "readable-index",
            "read",
            "http://x",
            "--max-body-bytes",
            "1024",
        ])
        .unwrap();
        assert_eq!(cli.reader_config().max_body_bytes, 1024);
    }
}
