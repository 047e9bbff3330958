//! Rendering of a category into a transport-agnostic status summary.
//!
//! The transport decides how a [`StatusSummary`] is encoded (for Discord, a
//! single embed).

use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::feed::{MonitorRecord, MonitorStatus};

/// Suffix appended to the category title.
pub const TITLE_SUFFIX: &str = " Monitor";

/// Accent color for rendered summaries (`#0099ff`).
pub const ACCENT_COLOR: u32 = 0x0099_FF;

const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Glyph shown in front of each monitor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusGlyph {
    /// 🔴
    Offline,
    /// 🟢
    Online,
    /// 🟡
    Warning,
    /// 🔵
    Maintenance,
    /// ❓
    Unknown,
}

impl StatusGlyph {
    /// Returns the emoji for this glyph.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "🔴",
            Self::Online => "🟢",
            Self::Warning => "🟡",
            Self::Maintenance => "🔵",
            Self::Unknown => "❓",
        }
    }
}

impl From<MonitorStatus> for StatusGlyph {
    fn from(status: MonitorStatus) -> Self {
        match status {
            MonitorStatus::Down => Self::Offline,
            MonitorStatus::Up => Self::Online,
            MonitorStatus::Warning => Self::Warning,
            MonitorStatus::Maintenance => Self::Maintenance,
            MonitorStatus::Unknown(_) => Self::Unknown,
        }
    }
}

impl fmt::Display for StatusGlyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendered content for one category message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// `"<category> Monitor"`.
    pub title: String,
    /// One `"<glyph> | <name>"` line per monitor.
    pub body: String,
    /// Dashboard link.
    pub link: String,
    /// `"Last updated: <timestamp>"`.
    pub footer: String,
    /// Accent color as `0xRRGGBB`.
    pub color: u32,
}

/// Formats one monitor line.
#[must_use]
pub fn monitor_line(record: &MonitorRecord) -> String {
    format!("{} | {}", StatusGlyph::from(record.status), record.name)
}

/// Formats a timestamp the way the footer shows it, e.g. `10/17/2026, 3:04:05 PM`.
#[must_use]
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Renders a category's matched monitors, in the order given.
#[must_use]
pub fn render_summary<Tz: TimeZone>(
    category: &str,
    monitors: &[&MonitorRecord],
    link: &str,
    updated_at: &DateTime<Tz>,
) -> StatusSummary
where
    Tz::Offset: fmt::Display,
{
    let body = monitors
        .iter()
        .map(|r| monitor_line(r))
        .collect::<Vec<_>>()
        .join("\n");

    StatusSummary {
        title: format!("{category}{TITLE_SUFFIX}"),
        body,
        link: link.to_string(),
        footer: format!("Last updated: {}", format_timestamp(updated_at)),
        color: ACCENT_COLOR,
    }
}
