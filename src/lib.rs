//! # status-sync - live monitor status messages for a chat channel
//!
//! status-sync polls an Uptime Kuma metrics feed, groups monitors into
//! user-defined categories, and keeps exactly one status message per category
//! up to date in a chat channel.
//!
//! ## Core Concepts
//!
//! - **Feed**: the `monitor_status{...} <code>` series of the metrics text
//! - **Category**: a titled set of filters (exact names or regexes, OR-ed)
//! - **Summary**: the rendered message for one category
//! - **Reconciler**: decides per cycle whether a category's message is sent or edited
//!
//! ## Usage
//!
//! ```rust,ignore
//! use status_sync::{CycleId, InMemoryTransport, Settings};
//!
//! let settings = Settings::load_from_env()?;
//! let reconciler = settings.reconciler();
//! let mut state = reconciler.initial_state();
//!
//! let transport = InMemoryTransport::new(settings.discord.guild.clone(), settings.discord.channel.clone());
//! let report = reconciler.run_cycle(&transport, &feed_body, &mut state, CycleId::new()).await;
//! println!("sent {} updated {}", report.sent(), report.updated());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Pure pipeline stages
pub mod category;
pub mod error;
pub mod feed;
pub mod filter;
pub mod render;

// Stateful sync and its collaborators
pub mod config;
pub mod driver;
pub mod sync;
pub mod transport;

// Re-export primary types at crate root for convenience
pub use category::{categorize, CategoryMatch, CategorySpec};
pub use config::Settings;
pub use driver::StatusSync;
pub use error::{ConfigError, FetchError, SyncError, SyncResult, TransportError};
pub use feed::{parse_feed, FeedResponse, FeedSource, MonitorRecord, MonitorStatus};
pub use filter::{CaseSensitivity, FilterMatcher, FilterSpec, RawFilter};
pub use render::{render_summary, StatusGlyph, StatusSummary};
pub use sync::{
	CategoryOutcome, ChannelMessageState, CycleId, CyclePlan, CycleReport, Reconciler, SyncRequest,
};
pub use transport::{
	ChannelId, ChannelInfo, ChatTransport, GuildId, GuildInfo, InMemoryTransport, MessageId,
	PostedMessage, TransportOp,
};

#[cfg(feature = "http")]
pub use feed::HttpFeedClient;
#[cfg(feature = "http")]
pub use transport::DiscordTransport;
