//! Chat transport boundary.
//!
//! The sync engine only ever talks to the chat service through
//! [`ChatTransport`]. Two implementations ship with the crate:
//! - [`InMemoryTransport`]: a recording fake for tests and dry runs
//! - `DiscordTransport` (feature `http`): Discord REST API v10

/// Discord REST transport.
#[cfg(feature = "http")]
pub mod discord;
/// In-memory recording transport.
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::render::StatusSummary;

#[cfg(feature = "http")]
pub use discord::DiscordTransport;
pub use memory::{InMemoryTransport, TransportCall, TransportOp};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Guild (server) identifier.
    GuildId
);
string_id!(
    /// Channel identifier.
    ChannelId
);
string_id!(
    /// Message identifier.
    MessageId
);

/// Resolved guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    /// Guild id.
    pub id: GuildId,
    /// Display name, when known.
    pub name: Option<String>,
}

/// Resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel id.
    pub id: ChannelId,
    /// Whether messages can be posted to it.
    pub text_based: bool,
}

/// A message that exists in the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Message id.
    pub id: MessageId,
}

/// Operations the sync engine needs from a chat service.
///
/// `Ok(None)` from a lookup means "does not exist"; `Err` means the service
/// could not answer.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Looks up a guild.
    async fn fetch_guild(&self, guild: &GuildId) -> Result<Option<GuildInfo>, TransportError>;

    /// Looks up a channel.
    async fn fetch_channel(&self, channel: &ChannelId) -> Result<Option<ChannelInfo>, TransportError>;

    /// Posts a new message and returns its id.
    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &StatusSummary,
    ) -> Result<MessageId, TransportError>;

    /// Looks up a previously posted message.
    async fn fetch_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<Option<PostedMessage>, TransportError>;

    /// Replaces the content of an existing message.
    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &StatusSummary,
    ) -> Result<(), TransportError>;

    /// Deletes the channel's message history. Returns the number of deleted messages.
    async fn clear_channel_history(&self, channel: &ChannelId) -> Result<usize, TransportError>;
}
