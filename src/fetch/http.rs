//! HTTP provider fetching.
//!
//! Provides the default [`Fetcher`], a blocking HTTP client.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

use super::Fetcher;

/// Fetches provider responses over HTTP/HTTPS.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Name this fetcher registers under.
    pub const NAME: &'static str = "http";

    /// Create a new HTTP fetcher with default 30-second timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP fetcher with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("oembed-links/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            timeout,
        }
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP {} fetching {}", response.status(), url);
        }

        response
            .text()
            .with_context(|| format!("Failed to read response from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn default_timeout_is_30_seconds() {
        let fetcher = HttpFetcher::new();
        assert_eq!(fetcher.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn custom_timeout() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5));
        assert_eq!(fetcher.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn registers_as_http() {
        assert_eq!(HttpFetcher::default().name(), "http");
    }

    #[test]
    fn fetches_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/oembed.json")
                .query_param("url", "http://t.net/foo");
            then.status(200).body(r#"{"html":"X"}"#);
        });

        let fetcher = HttpFetcher::new();
        let body = fetcher
            .fetch(&server.url("/oembed.json?url=http%3A%2F%2Ft.net%2Ffoo"))
            .unwrap();

        mock.assert();
        assert_eq!(body, r#"{"html":"X"}"#);
    }

    #[test]
    fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/oembed.json");
            then.status(404);
        });

        let fetcher = HttpFetcher::new();
        let err = fetcher.fetch(&server.url("/oembed.json")).unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
