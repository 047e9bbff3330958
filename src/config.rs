//! Daemon configuration.
//!
//! Settings come from a YAML file, with secrets overridable from the
//! environment. Everything is validated up front: an invalid configuration
//! (including a bad regex filter) stops the process before polling starts.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::category::CategorySpec;
use crate::error::ConfigError;
use crate::filter::{CaseSensitivity, FilterMatcher, RawFilter};
use crate::sync::Reconciler;
use crate::transport::{ChannelId, GuildId};

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
/// Environment variable overriding `discord.token`.
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
/// Environment variable overriding `uptimeKuma.apiKey`.
pub const ENV_FEED_API_KEY: &str = "UPTIME_KUMA_API_KEY";

/// Config file used when `CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;

/// Snowflakes may be written quoted or bare in YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiscord {
    token: Option<String>,
    guild_id: Option<RawId>,
    channel_id: Option<RawId>,
    client_id: Option<RawId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeed {
    url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default)]
    filters: Vec<RawFilter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMonitors {
    case_sensitive: Option<bool>,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    discord: RawDiscord,
    update_interval: Option<u64>,
    #[serde(default)]
    uptime_kuma: RawFeed,
    #[serde(default)]
    monitors: RawMonitors,
}

/// Chat connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DiscordSettings {
    /// Bot token.
    pub token: String,
    /// Guild the channel lives in.
    pub guild: GuildId,
    /// Channel holding the status messages.
    pub channel: ChannelId,
    /// Application id (informational).
    pub client_id: Option<String>,
}

impl fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &"<redacted>")
            .field("guild", &self.guild)
            .field("channel", &self.channel)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Feed endpoint settings.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Metrics endpoint, also used as the dashboard link.
    pub url: String,
    /// API key sent as the basic-auth password.
    pub api_key: Option<String>,
}

impl fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSettings")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Chat connection.
    pub discord: DiscordSettings,
    /// Feed endpoint.
    pub feed: FeedSettings,
    /// Time between sync cycles.
    pub update_interval: Duration,
    /// Global filter case policy.
    pub case_sensitivity: CaseSensitivity,
    /// Categories in declaration order.
    pub categories: Vec<CategorySpec>,
}

impl Settings {
    /// Parses and validates YAML text. `env` supplies overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed YAML or invalid settings.
    pub fn from_yaml<F>(text: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            })?
        };
        Self::validate(raw, &env)
    }

    /// Reads `path` and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`Settings::from_yaml`].
    pub fn load<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&text, env)
    }

    /// Loads from `CONFIG_PATH` (or the default path) with process env overrides.
    ///
    /// # Errors
    ///
    /// As [`Settings::load`].
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        Self::load(&config_path(env), env)
    }

    fn validate(raw: RawConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = non_empty(env(ENV_DISCORD_TOKEN))
            .or_else(|| non_empty(raw.discord.token))
            .ok_or_else(|| missing("discord.token"))?;
        let guild = non_empty(raw.discord.guild_id.map(RawId::into_string))
            .ok_or_else(|| missing("discord.guildId"))?;
        let channel = non_empty(raw.discord.channel_id.map(RawId::into_string))
            .ok_or_else(|| missing("discord.channelId"))?;
        let client_id = non_empty(raw.discord.client_id.map(RawId::into_string));

        let url = non_empty(raw.uptime_kuma.url).ok_or_else(|| missing("uptimeKuma.url"))?;
        let api_key = non_empty(env(ENV_FEED_API_KEY)).or_else(|| non_empty(raw.uptime_kuma.api_key));

        let interval_secs = raw.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        // Only an explicit `false` turns case sensitivity off.
        let case_sensitivity = CaseSensitivity::from_flag(raw.monitors.case_sensitive != Some(false));
        let matcher = FilterMatcher::new(case_sensitivity);

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(raw.monitors.sections.len());
        for section in raw.monitors.sections {
            let title = section.title.trim().to_string();
            if title.is_empty() {
                return Err(ConfigError::EmptyCategoryTitle);
            }
            if !seen.insert(title.clone()) {
                return Err(ConfigError::DuplicateCategory { title });
            }
            if section.filters.is_empty() {
                return Err(ConfigError::EmptyFilters { title });
            }
            categories.push(CategorySpec::compile(title, &section.filters, &matcher)?);
        }
        if categories.is_empty() {
            warn!("no monitor sections configured; nothing will be posted");
        }

        Ok(Self {
            discord: DiscordSettings {
                token,
                guild: GuildId::new(guild),
                channel: ChannelId::new(channel),
                client_id,
            },
            feed: FeedSettings { url, api_key },
            update_interval: Duration::from_secs(interval_secs),
            case_sensitivity,
            categories,
        })
    }

    /// Matcher for the configured case policy.
    #[must_use]
    pub const fn matcher(&self) -> FilterMatcher {
        FilterMatcher::new(self.case_sensitivity)
    }

    /// Builds the reconciler for the configured channel and categories.
    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.discord.channel.clone(),
            self.categories.clone(),
            self.matcher(),
            self.feed.url.clone(),
        )
    }
}

/// Resolves the config file path from `CONFIG_PATH`.
#[must_use]
pub fn config_path<F>(env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(env(ENV_CONFIG_PATH)).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn missing(field: &str) -> ConfigError {
    ConfigError::MissingField {
        field: field.to_string(),
    }
}
