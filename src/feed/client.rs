use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;

use super::{FeedResponse, FeedSource};

/// Basic-auth user name paired with the API key.
pub const FEED_AUTH_USER: &str = "uptime-token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the metrics endpoint over HTTP with optional API key auth.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpFeedClient {
    /// Creates a client for `url` using the default request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, FetchError> {
        Self::with_timeout(url, api_key, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn with_timeout(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.basic_auth(FEED_AUTH_USER, Some(key));
        }

        let response = request.send().await.map_err(|e| FetchError::Request {
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FetchError::Body {
            message: e.to_string(),
        })?;

        debug!(status, bytes = body.len(), "fetched feed");
        Ok(FeedResponse { status, body })
    }
}
