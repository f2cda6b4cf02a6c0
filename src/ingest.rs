// src/ingest.rs
// =============================================================================
// The bookmark-save workflow: read a page, then persist and index the result.
//
// Key functionality:
// - One bookmark is one unit of work: fetch -> extract -> store, strictly in
//   that order
// - Different bookmarks run concurrently with a bounded limit
// - A failure stays with its bookmark; the rest of the batch carries on
//
// Fetch problems are not failures here at all (they become status codes on
// the ReadResult). Only database errors come back as Err, because a dropped
// index write would leave the search surface silently stale.
// =============================================================================

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::fulltext::FulltextIndex;
use crate::readable::{ReadResult, Reader};

/// Default number of bookmarks processed at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Where a bookmark's html comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Fetch the page over the network
    Url(String),
    /// Html supplied at bookmark-creation time
    Html(String),
}

/// One bookmark to process.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub bid: i64,
    pub source: Source,
}

/// What happened to one job of a batch.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub bid: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<ReadResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Reads one bookmark's source and stores the result next to it.
pub async fn ingest_one(
    reader: &Reader,
    index: &dyn FulltextIndex,
    bid: i64,
    source: &Source,
) -> Result<ReadResult> {
    let read = match source {
        Source::Url(url) => reader.read_url(url).await,
        Source::Html(html) => reader.read_content(html),
    };
    index.store_readable(bid, &read).await?;
    Ok(read)
}

/// Processes many bookmarks, at most `concurrency` at a time.
///
/// Outcomes come back in completion order, not submission order.
pub async fn ingest_batch(
    reader: &Reader,
    index: Arc<dyn FulltextIndex>,
    jobs: Vec<IngestJob>,
    concurrency: usize,
) -> Vec<IngestOutcome> {
    let total = jobs.len();

    let futures = jobs.into_iter().map(|job| {
        let reader = reader.clone();
        let index = index.clone();
        async move {
            match ingest_one(&reader, index.as_ref(), job.bid, &job.source).await {
                Ok(read) => IngestOutcome {
                    bid: job.bid,
                    read: Some(read),
                    error: None,
                },
                Err(e) => {
                    warn!(bid = job.bid, error = %e, "could not store readable content");
                    IngestOutcome {
                        bid: job.bid,
                        read: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });

    let outcomes: Vec<IngestOutcome> = stream::iter(futures)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(total, failed, "ingested batch");
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::fulltext::{FulltextQuery, SearchRequest, SearchScope, SqliteFulltext};
    use sqlx::sqlite::SqlitePoolOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn index_with_bookmarks(bids: &[i64]) -> Arc<SqliteFulltext> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE bmarks (bid INTEGER PRIMARY KEY, description TEXT, extended TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        for bid in bids {
            sqlx::query("INSERT INTO bmarks (bid, description, extended) VALUES (?, '', '')")
                .bind(bid)
                .execute(&pool)
                .await
                .unwrap();
        }
        let index = Arc::new(SqliteFulltext::from_pool(pool));
        index.install().await.unwrap();
        index
    }

    async fn content_hits(index: &SqliteFulltext, term: &str) -> Vec<i64> {
        let query = FulltextQuery::parse(&SearchRequest::new(term, SearchScope::Content)).unwrap();
        index.search(&query).await.unwrap()
    }

    #[tokio::test]
    async fn test_ingest_url_then_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(
                        "<html><body><article><p>Readable pipelines make bookmarks \
                         searchable, even years after they were saved.</p></article></body></html>",
                    ),
            )
            .mount(&server)
            .await;

        let index = index_with_bookmarks(&[1]).await;
        let reader = Reader::new(&ReaderConfig::default()).unwrap();

        let read = ingest_one(
            &reader,
            index.as_ref(),
            1,
            &Source::Url(format!("{}/post", server.uri())),
        )
        .await
        .unwrap();

        assert_eq!(read.status_code(), 200);
        assert_eq!(content_hits(&index, "pipelines").await, vec![1]);
    }

    #[tokio::test]
    async fn test_batch_keeps_going_after_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let index = index_with_bookmarks(&[1, 2]).await;
        let reader = Reader::new(&ReaderConfig::default()).unwrap();

        let jobs = vec![
            IngestJob {
                bid: 1,
                source: Source::Html(
                    "<p>Given content about the Bookie bookmark manager and its search.</p>"
                        .to_string(),
                ),
            },
            IngestJob {
                bid: 2,
                source: Source::Url(format!("{}/gone", server.uri())),
            },
            // no such bookmark: the store fails, the others must not care
            IngestJob {
                bid: 99,
                source: Source::Html("<p>orphan</p>".to_string()),
            },
        ];

        let mut outcomes = ingest_batch(&reader, index.clone(), jobs, 2).await;
        outcomes.sort_by_key(|o| o.bid);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].read.as_ref().unwrap().status_code(), 1);
        assert_eq!(outcomes[1].read.as_ref().unwrap().status_code(), 404);
        assert!(outcomes[1].read.as_ref().unwrap().content().is_none());
        assert!(!outcomes[2].is_ok());

        assert_eq!(content_hits(&index, "bookie").await, vec![1]);
    }
}
