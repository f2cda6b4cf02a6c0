// src/readable/mod.rs
// =============================================================================
// Turns a URL or an HTML blob into a ReadResult.
//
// Submodules:
// - status: the numeric status taxonomy (1, 2xx, 4xx.., 901, 902)
// - fetch: the network side (timeout, redirects, content-type sniffing)
// - extract: readability scoring and text rendering
//
// Both entry points (URL mode and given-content mode) end in the same
// extractor and hand back the same read-only ReadResult, so the code that
// stores it never needs to know where the html came from.
// =============================================================================

mod extract;
mod fetch;
mod status;

pub use extract::{extract, normalize_whitespace};
pub use fetch::{content_type_essence, is_image_type, FetchError, FetchedPage, Fetcher};
pub use status::{ReadStatus, PARSED_CODE, TOO_MANY_REDIRECTS_CODE, UNREACHABLE_CODE};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReaderConfig;
use crate::error::Result;

/// Outcome of one fetch/parse attempt.
///
/// Fields are private so the invariants hold for every value in circulation:
/// an image never carries content, and a failed status never carries content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    status: ReadStatus,
    status_message: Option<String>,
    content_type: Option<String>,
    is_image: bool,
    content: Option<String>,
}

impl ReadResult {
    /// Successful read. Content is dropped for images.
    pub(crate) fn success(status: ReadStatus, content_type: Option<String>, content: Option<String>) -> Self {
        let is_image = content_type.as_deref().is_some_and(is_image_type);
        Self {
            status,
            status_message: Some(status.default_message().to_string()),
            content_type,
            is_image,
            content: if is_image { None } else { content },
        }
    }

    /// Failed read; never carries content.
    pub(crate) fn failure(status: ReadStatus, content_type: Option<String>, message: String) -> Self {
        let is_image = content_type.as_deref().is_some_and(is_image_type);
        Self {
            status,
            status_message: Some(message),
            content_type,
            is_image,
            content: None,
        }
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_image(&self) -> bool {
        self.is_image
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn into_content(self) -> Option<String> {
        self.content
    }
}

/// Given-content mode: parse html that was supplied out-of-band.
///
/// Never touches the network and always reports status 1.
pub fn read_content(html: &str) -> ReadResult {
    let content = extract(html);
    debug!(found = content.is_some(), "parsed given content");
    ReadResult::success(ReadStatus::Parsed, None, content)
}

// Extraction is CPU-bound, so it runs on the blocking pool. A panic in there
// still yields "no content" for the page, but it is logged as a failure.
async fn off_thread<F>(url: &str, work: F) -> Option<String>
where
    F: FnOnce() -> Option<String> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(content) => content,
        Err(e) => {
            warn!(url, error = %e, "extraction task failed");
            None
        }
    }
}

/// Fetches and extracts pages. Cheap to clone; clones share one HTTP client.
#[derive(Debug, Clone)]
pub struct Reader {
    fetcher: Fetcher,
}

impl Reader {
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
        })
    }

    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// URL mode. Never fails: every outcome is expressed as a status.
    pub async fn read_url(&self, url: &str) -> ReadResult {
        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(url, error = %e, "fetch failed");
                return ReadResult::failure(e.status(), None, e.to_string());
            }
        };

        let status = ReadStatus::Http(page.status);
        if !page.is_success() {
            return ReadResult::failure(
                status,
                page.content_type,
                status.default_message().to_string(),
            );
        }

        if page.is_image() {
            return ReadResult::success(status, page.content_type, None);
        }

        let content = match page.body {
            Some(body) => off_thread(url, move || extract(&body)).await,
            None => None,
        };

        ReadResult::success(status, page.content_type, content)
    }

    /// Given-content mode through the same handle as URL mode.
    pub fn read_content(&self, html: &str) -> ReadResult {
        read_content(html)
    }
}
