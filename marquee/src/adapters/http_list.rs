//! HTTP list adapter
//!
//! Fetches a URL serving the plain-text list format. Site-specific markup
//! extraction is out of scope; point this at an exported or mirrored list.

use super::listing::parse_document;
use crate::types::{AdapterError, EntryStream, SourceAdapter};
use futures::StreamExt;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Default timeout for list requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Some list sites reject requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (compatible; marquee/0.1)";

/// Fetches a list over HTTP(S) on every `produce`
pub struct HttpListAdapter {
    source_id: String,
    url: String,
    http_client: Client,
}

impl HttpListAdapter {
    pub fn new(source_id: impl Into<String>, url: impl Into<String>) -> Result<Self, AdapterError> {
        Self::with_timeout(source_id, url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        source_id: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            source_id: source_id.into(),
            url: url.into(),
            http_client,
        })
    }

    async fn fetch(&self) -> Result<String, AdapterError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

impl SourceAdapter for HttpListAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn produce(&self) -> EntryStream<'_> {
        async_stream::stream! {
            let text = match self.fetch().await {
                Ok(text) => text,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            debug!(source = %self.source_id, url = %self.url, bytes = text.len(), "List fetched");

            for entry in parse_document(&self.source_id, &text) {
                yield entry;
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        // Port 9 on localhost: nothing listens, connection is refused
        let adapter = HttpListAdapter::with_timeout(
            "imdb",
            "http://127.0.0.1:9/list.txt",
            Duration::from_secs(2),
        )
        .unwrap();

        let entries: Vec<_> = adapter.produce().collect().await;

        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], Err(AdapterError::Fetch(_))));
    }

    #[test]
    fn test_source_id() {
        let adapter = HttpListAdapter::new("rt", "https://example.com/rt.txt").unwrap();
        assert_eq!(adapter.source_id(), "rt");
    }
}
