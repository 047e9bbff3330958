//! Error types for status-sync.
//!
//! All errors are strongly typed using thiserror, one enum per failure
//! domain, folded into [`SyncError`] at the top level. The domains mirror
//! how a running daemon treats them: configuration errors stop the process
//! before polling begins, everything else is logged and retried on the next
//! cycle.

use thiserror::Error;

/// Configuration errors, raised while loading and validating settings.
///
/// These are the only errors that are fatal: the process does not begin
/// polling when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {message}")]
    Read {
        path: String,
        message: String,
    },

    #[error("Invalid config: {message}")]
    Parse {
        message: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Update interval must be at least 1 second")]
    InvalidInterval,

    #[error("Category title cannot be empty")]
    EmptyCategoryTitle,

    #[error("Category '{title}' is declared more than once")]
    DuplicateCategory {
        title: String,
    },

    #[error("Category '{title}' has no filters")]
    EmptyFilters {
        title: String,
    },

    #[error("Invalid regex '{pattern}' in category '{category}': {reason}")]
    InvalidRegex {
        category: String,
        pattern: String,
        reason: String,
    },
}

/// Errors from fetching the monitoring feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Feed request failed: {message}")]
    Request {
        message: String,
    },

    #[error("Failed to fetch metrics: HTTP {status}")]
    Status {
        status: u16,
    },

    #[error("Failed to read feed body: {message}")]
    Body {
        message: String,
    },
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
    },

    #[error("Chat API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    #[error("Unable to find guild with ID {id}")]
    GuildUnavailable {
        id: String,
    },

    #[error("Unable to find text channel with ID {id}")]
    ChannelUnavailable {
        id: String,
    },

    #[error("Failed to decode chat API response: {message}")]
    Decode {
        message: String,
    },

    #[error("Injected failure: {operation}")]
    Injected {
        operation: String,
    },
}

/// Top-level error type for status-sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SyncError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a feed fetch error.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the next scheduled cycle may succeed where this one failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Fetch(_) => true,
            Self::Transport(e) => match e {
                TransportError::Api { status, .. } => *status >= 500 || *status == 404 || *status == 429,
                _ => true,
            },
        }
    }
}

/// Result type alias for status-sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
