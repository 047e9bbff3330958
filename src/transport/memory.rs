//! In-memory chat transport.
//!
//! Keeps messages in process memory, records every call and can be told to
//! fail the next N calls of a given operation. It backs the test-suite and
//! the daemon's `--dry-run` mode.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::render::StatusSummary;

use super::{ChannelId, ChannelInfo, ChatTransport, GuildId, GuildInfo, MessageId, PostedMessage};

const FIRST_MESSAGE_ID: u64 = 1_000;

/// Transport operation kinds, used for call records and failure injection.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    FetchGuild,
    FetchChannel,
    SendMessage,
    FetchMessage,
    EditMessage,
    ClearChannelHistory,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchGuild => "fetch_guild",
            Self::FetchChannel => "fetch_channel",
            Self::SendMessage => "send_message",
            Self::FetchMessage => "fetch_message",
            Self::EditMessage => "edit_message",
            Self::ClearChannelHistory => "clear_channel_history",
        };
        f.write_str(name)
    }
}

/// One recorded call.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    pub op: TransportOp,
    pub message: Option<MessageId>,
}

#[derive(Debug)]
struct StoredMessage {
    channel: ChannelId,
    content: StatusSummary,
}

#[derive(Debug, Default)]
struct MemoryState {
    guilds: HashSet<GuildId>,
    channels: HashMap<ChannelId, bool>,
    messages: BTreeMap<u64, (MessageId, StoredMessage)>,
    next_id: u64,
    calls: Vec<TransportCall>,
    failures: HashMap<TransportOp, usize>,
}

impl MemoryState {
    fn begin(&mut self, op: TransportOp, message: Option<&MessageId>) -> Result<(), TransportError> {
        self.calls.push(TransportCall {
            op,
            message: message.cloned(),
        });
        match self.failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(TransportError::Injected {
                    operation: op.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn require_text_channel(&self, channel: &ChannelId) -> Result<(), TransportError> {
        match self.channels.get(channel) {
            Some(true) => Ok(()),
            _ => Err(TransportError::ChannelUnavailable {
                id: channel.to_string(),
            }),
        }
    }

    fn find(&self, channel: &ChannelId, message: &MessageId) -> Option<u64> {
        self.messages
            .iter()
            .find(|(_, (id, stored))| id == message && &stored.channel == channel)
            .map(|(key, _)| *key)
    }

    fn insert(&mut self, channel: &ChannelId, content: StatusSummary) -> MessageId {
        let key = self.next_id;
        self.next_id += 1;
        let id = MessageId::new(key.to_string());
        self.messages.insert(
            key,
            (
                id.clone(),
                StoredMessage {
                    channel: channel.clone(),
                    content,
                },
            ),
        );
        id
    }
}

/// Recording in-memory [`ChatTransport`].
#[derive(Debug)]
pub struct InMemoryTransport {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: FIRST_MESSAGE_ID,
                ..MemoryState::default()
            }),
        }
    }
}

impl InMemoryTransport {
    /// Creates a transport that knows one guild and one text channel.
    #[must_use]
    pub fn new(guild: GuildId, channel: ChannelId) -> Self {
        let transport = Self::default();
        {
            let mut state = transport.lock();
            state.guilds.insert(guild);
            state.channels.insert(channel, true);
        }
        transport
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a channel; `text_based = false` makes it unusable for posting.
    pub fn add_channel(&self, channel: ChannelId, text_based: bool) {
        self.lock().channels.insert(channel, text_based);
    }

    /// Removes a guild, as if the bot had been kicked.
    pub fn remove_guild(&self, guild: &GuildId) {
        self.lock().guilds.remove(guild);
    }

    /// Posts a message without recording a call, simulating prior history.
    pub fn seed_message(&self, channel: &ChannelId, content: StatusSummary) -> MessageId {
        self.lock().insert(channel, content)
    }

    /// Deletes a message out-of-band, simulating manual deletion.
    pub fn remove_message(&self, message: &MessageId) -> bool {
        let mut state = self.lock();
        let key = state
            .messages
            .iter()
            .find(|(_, (id, _))| id == message)
            .map(|(key, _)| *key);
        key.and_then(|k| state.messages.remove(&k)).is_some()
    }

    /// Makes the next `times` calls of `op` fail.
    pub fn fail_next(&self, op: TransportOp, times: usize) {
        *self.lock().failures.entry(op).or_insert(0) += times;
    }

    /// Returns the current content of a message.
    #[must_use]
    pub fn message(&self, message: &MessageId) -> Option<StatusSummary> {
        self.lock()
            .messages
            .values()
            .find(|(id, _)| id == message)
            .map(|(_, stored)| stored.content.clone())
    }

    /// Returns the ids of all messages in `channel`, oldest first.
    #[must_use]
    pub fn message_ids(&self, channel: &ChannelId) -> Vec<MessageId> {
        self.lock()
            .messages
            .values()
            .filter(|(_, stored)| &stored.channel == channel)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns all recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Counts recorded calls of `op`.
    #[must_use]
    pub fn count(&self, op: TransportOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }
}

#[async_trait]
impl ChatTransport for InMemoryTransport {
    async fn fetch_guild(&self, guild: &GuildId) -> Result<Option<GuildInfo>, TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::FetchGuild, None)?;
        Ok(state.guilds.contains(guild).then(|| GuildInfo {
            id: guild.clone(),
            name: None,
        }))
    }

    async fn fetch_channel(&self, channel: &ChannelId) -> Result<Option<ChannelInfo>, TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::FetchChannel, None)?;
        Ok(state.channels.get(channel).map(|&text_based| ChannelInfo {
            id: channel.clone(),
            text_based,
        }))
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        content: &StatusSummary,
    ) -> Result<MessageId, TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::SendMessage, None)?;
        state.require_text_channel(channel)?;
        Ok(state.insert(channel, content.clone()))
    }

    async fn fetch_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<Option<PostedMessage>, TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::FetchMessage, Some(message))?;
        state.require_text_channel(channel)?;
        Ok(state.find(channel, message).map(|_| PostedMessage {
            id: message.clone(),
        }))
    }

    async fn edit_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &StatusSummary,
    ) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::EditMessage, Some(message))?;
        state.require_text_channel(channel)?;
        let key = state.find(channel, message).ok_or_else(|| TransportError::Api {
            status: 404,
            message: format!("Unknown Message {message}"),
        })?;
        if let Some((_, stored)) = state.messages.get_mut(&key) {
            stored.content = content.clone();
        }
        Ok(())
    }

    async fn clear_channel_history(&self, channel: &ChannelId) -> Result<usize, TransportError> {
        let mut state = self.lock();
        state.begin(TransportOp::ClearChannelHistory, None)?;
        state.require_text_channel(channel)?;
        let before = state.messages.len();
        state.messages.retain(|_, (_, stored)| &stored.channel != channel);
        Ok(before - state.messages.len())
    }
}
