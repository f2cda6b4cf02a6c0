// src/readable/fetch.rs
// =============================================================================
// Retrieves a single URL for the readability pipeline.
//
// Key functionality:
// - One shared reqwest client with a bounded timeout and redirect limit
// - Exactly one attempt per call (retry policy belongs to the caller)
// - Network-layer failures collapse into FetchError, which the reader turns
//   into status 901/902
// - Image responses are flagged from the Content-Type header and their body
//   is never read or decoded
// - Bodies are read up to ReaderConfig::max_body_bytes and no further
// =============================================================================

use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, Response};
use tracing::debug;
use url::Url;

use crate::config::{ReaderConfig, DEFAULT_MAX_BODY_BYTES};
use crate::error::Result;

use super::status::ReadStatus;

/// What the network handed back for one URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final HTTP status after redirects were followed
    pub status: u16,
    /// Declared media type without parameters, lowercased ("text/html")
    pub content_type: Option<String>,
    /// Decoded body; only present for 2xx responses that are not images
    pub body: Option<String>,
}

impl FetchedPage {
    pub fn is_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_image_type)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a fetch produced no HTTP response at all.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("could not resolve or connect: {0}")]
    Connect(String),
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("tls error: {0}")]
    Tls(String),
    #[error("network error: {0}")]
    Other(String),
}

impl FetchError {
    /// Maps onto the status taxonomy. Everything except the redirect cap is
    /// "unreachable".
    pub fn status(&self) -> ReadStatus {
        match self {
            FetchError::TooManyRedirects => ReadStatus::TooManyRedirects,
            _ => ReadStatus::Unreachable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Builds a fetcher around an existing client (shared connection pool).
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        let parsed = validate_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(content_type_essence);

        let mut page = FetchedPage {
            status,
            content_type,
            body: None,
        };

        if page.is_success() && !page.is_image() {
            page.body = Some(read_body(response, self.max_body_bytes).await?);
        }

        debug!(
            url,
            status = page.status,
            content_type = page.content_type.as_deref().unwrap_or("-"),
            "fetched"
        );
        Ok(page)
    }
}

// A declared length is checked before anything is downloaded and the body is
// then decoded by reqwest, which honours the charset parameter. Without one
// (chunked transfer) chunks are counted as they arrive and the bytes are
// decoded as utf-8.
async fn read_body(mut response: Response, limit: usize) -> std::result::Result<String, FetchError> {
    match response.content_length() {
        Some(length) if length > limit as u64 => return Err(FetchError::TooLarge { limit }),
        Some(_) => return response.text().await.map_err(categorize_error),
        None => {}
    }

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(categorize_error)? {
        if bytes.len() + chunk.len() > limit {
            return Err(FetchError::TooLarge { limit });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn validate_url(url: &str) -> std::result::Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

// reqwest only flags timeouts, redirects and connect failures directly.
// Certificate problems only show up in the message text.
fn categorize_error(error: reqwest::Error) -> FetchError {
    let message = error.to_string();

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        FetchError::Connect(message)
    } else if message.contains("certificate") || message.to_lowercase().contains("tls") {
        FetchError::Tls(message)
    } else {
        FetchError::Other(message)
    }
}

/// "Text/HTML; charset=utf-8" -> "text/html"
pub fn content_type_essence(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&ReaderConfig::default()).unwrap()
    }

    #[test]
    fn test_content_type_essence() {
        assert_eq!(content_type_essence("Text/HTML; charset=UTF-8"), "text/html");
        assert_eq!(content_type_essence("image/png"), "image/png");
        assert_eq!(content_type_essence(""), "");
    }

    #[test]
    fn test_image_family() {
        assert!(is_image_type("image/png"));
        assert!(is_image_type("image/svg+xml"));
        assert!(!is_image_type("text/html"));
        assert!(!is_image_type("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><p>hello</p></body></html>"),
            )
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/article", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
        assert!(page.body.unwrap().contains("hello"));
    }

    #[tokio::test]
    async fn test_image_body_is_not_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/logo.png", server.uri()))
            .await
            .unwrap();

        assert!(page.is_image());
        assert!(page.body.is_none());
    }

    #[tokio::test]
    async fn test_not_found_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let page = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.status, 404);
        assert!(page.body.is_none());
    }

    #[tokio::test]
    async fn test_redirect_loop_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/loop", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooManyRedirects));
        assert_eq!(err.status(), ReadStatus::TooManyRedirects);
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ReaderConfig {
            timeout: Duration::from_millis(200),
            ..ReaderConfig::default()
        };
        let err = Fetcher::new(&config)
            .unwrap()
            .fetch(&server.uri())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout));
        assert_eq!(err.status(), ReadStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_oversized_body_is_not_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(format!("<html><body><p>{}</p></body></html>", "x".repeat(500))),
            )
            .mount(&server)
            .await;

        let config = ReaderConfig {
            max_body_bytes: 64,
            ..ReaderConfig::default()
        };
        let err = Fetcher::new(&config)
            .unwrap()
            .fetch(&format!("{}/huge", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { limit: 64 }));
        assert_eq!(err.status(), ReadStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Grab a free port, then close it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = fetcher()
            .fetch(&format!("http://127.0.0.1:{}/", port))
            .await
            .unwrap_err();

        assert_eq!(err.status(), ReadStatus::Unreachable);
    }

    #[tokio::test]
    async fn test_invalid_urls_never_hit_the_network() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));

        let err = fetcher().fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert_eq!(err.status(), ReadStatus::Unreachable);
    }
}
