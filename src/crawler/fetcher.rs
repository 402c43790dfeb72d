//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests against the catalog API:
//! - Building the shared HTTP client from configuration
//! - Fetching one category and timing it
//! - Error classification for requests that never produced a status

use crate::config::ApiConfig;
use crate::crawler::category::{decode_category_info, CategoryInfo};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;

/// A request that produced an HTTP status
#[derive(Debug)]
pub struct FetchOutcome {
    /// HTTP status code
    pub status: u16,
    /// Time from sending the request until the response headers arrived
    pub elapsed: Duration,
    /// Decoded body, or a description of why it could not be read/decoded
    pub body: Result<CategoryInfo, String>,
}

/// A request that failed before any status was received
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },
}

impl FetchError {
    fn classify(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if e.is_connect() {
            Self::Connect {
                url: url.to_string(),
                source: e,
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// No request timeout is set unless `request-timeout-secs` is configured.
///
/// # Example
///
/// ```no_run
/// use catwalk::config::parse_config;
/// use catwalk::crawler::build_http_client;
///
/// let config = parse_config("[api]\nbase-url = \"https://shop.example/api/v1\"\n").unwrap();
/// let client = build_http_client(&config.api).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true);

    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// Fetches one category URL
///
/// Exactly one GET, no retries. `elapsed` stops when the response headers
/// are in; the body is read afterwards and decoded best-effort, so a broken
/// body never loses the status and timing.
pub async fn fetch_category(client: &Client, url: &str) -> Result<FetchOutcome, FetchError> {
    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::classify(url, e))?;
    let elapsed = start.elapsed();

    let status = response.status().as_u16();

    let body = match response.bytes().await {
        Ok(bytes) => decode_category_info(&bytes).map_err(|e| format!("decode error: {}", e)),
        Err(e) => Err(format!("body read error: {}", e)),
    };

    Ok(FetchOutcome {
        status,
        elapsed,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_config(timeout: Option<u64>) -> ApiConfig {
        let mut config = parse_config("[api]\nbase-url = \"https://shop.example/api/v1\"\n")
            .unwrap()
            .api;
        config.request_timeout_secs = timeout;
        config
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&api_config(None)).is_ok());
        assert!(build_http_client(&api_config(Some(5))).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/category/shoes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"pagination": {"currentPage": 1, "lastPage": 3}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = build_http_client(&api_config(None)).unwrap();
        let outcome = fetch_category(&client, &format!("{}/category/shoes", server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        let info = outcome.body.unwrap();
        assert_eq!(info.pagination.unwrap().last_page, Some(3));
    }

    #[tokio::test]
    async fn test_fetch_keeps_status_when_body_is_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&api_config(None)).unwrap();
        let outcome = fetch_category(&client, &format!("{}/category/x", server.uri()))
            .await
            .unwrap();

        assert_eq!(outcome.status, 502);
        assert!(outcome.body.is_err());
    }

    #[tokio::test]
    async fn test_elapsed_covers_response_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let client = build_http_client(&api_config(None)).unwrap();
        let outcome = fetch_category(&client, &format!("{}/category/slow", server.uri()))
            .await
            .unwrap();

        assert!(outcome.elapsed >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        // Bind and drop a listener so the port is very likely closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_http_client(&api_config(None)).unwrap();
        let result = fetch_category(&client, &format!("http://{}/category/x", addr)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_configured_timeout_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = build_http_client(&api_config(Some(1))).unwrap();
        let result = fetch_category(&client, &format!("{}/category/x", server.uri())).await;

        assert!(matches!(result, Err(FetchError::Timeout { .. })));
    }
}
