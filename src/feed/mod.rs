//! Monitoring feed: fetching the metrics text and parsing it into records.
//!
//! The parser is pure. Fetching sits behind the [`FeedSource`] trait so the
//! driver can be exercised without a network; the `http` feature provides the
//! reqwest-backed client.

/// HTTP feed client.
#[cfg(feature = "http")]
pub mod client;
/// Exposition text parser.
pub mod parser;

use async_trait::async_trait;

use crate::error::FetchError;

#[cfg(feature = "http")]
pub use client::{HttpFeedClient, FEED_AUTH_USER};
pub use parser::{parse_feed, parse_line, LineRejection, MonitorRecord, MonitorStatus};

/// Raw response of one feed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl FeedResponse {
    /// Creates a successful (HTTP 200) response.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body, or [`FetchError::Status`] for a non-2xx response.
    ///
    /// # Errors
    ///
    /// Fails when the status is not 2xx.
    pub fn into_body(self) -> Result<String, FetchError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FetchError::Status { status: self.status })
        }
    }
}

/// Source of the raw feed text.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the current feed. Non-2xx statuses are returned, not raised.
    async fn fetch(&self) -> Result<FeedResponse, FetchError>;
}
