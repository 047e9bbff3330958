//! Parser for the `monitor_status` series of the metrics exposition text.
//!
//! Only lines of the shape `monitor_status{label="value",...} <integer>` are
//! considered. Everything else (comments, other metric families, malformed
//! lines) is skipped without error.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

const METRIC_PREFIX: &str = "monitor_status{";

/// Status code reported for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    /// 0
    Down,
    /// 1
    Up,
    /// 2 (pending checks are reported as a warning)
    Warning,
    /// 3
    Maintenance,
    /// Any other code, kept verbatim.
    Unknown(i64),
}

impl MonitorStatus {
    /// Maps a raw status code onto the fixed status set.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Down,
            1 => Self::Up,
            2 => Self::Warning,
            3 => Self::Maintenance,
            other => Self::Unknown(other),
        }
    }

    /// Returns the raw status code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Warning => 2,
            Self::Maintenance => 3,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
            Self::Warning => write!(f, "warning"),
            Self::Maintenance => write!(f, "maintenance"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// One monitor as reported by a single feed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    /// Monitor name; identity key within one snapshot.
    pub name: String,
    /// Monitor type (`http`, `port`, `ping`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<String>,
    /// Target URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Target hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Target port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Reported status.
    pub status: MonitorStatus,
}

impl MonitorRecord {
    /// Creates a record with only a name and status.
    #[must_use]
    pub fn new(name: impl Into<String>, status: MonitorStatus) -> Self {
        Self {
            name: name.into(),
            monitor_type: None,
            url: None,
            hostname: None,
            port: None,
            status,
        }
    }
}

/// Why a single feed line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRejection {
    /// Not a `monitor_status{...}` sample.
    NotMonitorStatus,
    /// The label set is never closed.
    UnterminatedLabels,
    /// No value follows the label set.
    MissingValue,
    /// The value is not an integer.
    InvalidStatus(String),
    /// The sample carries no `monitor_name` label.
    MissingName,
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMonitorStatus => write!(f, "not a monitor_status sample"),
            Self::UnterminatedLabels => write!(f, "unterminated label set"),
            Self::MissingValue => write!(f, "missing sample value"),
            Self::InvalidStatus(raw) => write!(f, "invalid status value '{raw}'"),
            Self::MissingName => write!(f, "missing monitor_name label"),
        }
    }
}

/// Parses a whole feed body. Output order follows input line order.
#[must_use]
pub fn parse_feed(body: &str) -> Vec<MonitorRecord> {
    let mut records = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        match parse_line(line) {
            Ok(record) => records.push(record),
            Err(LineRejection::NotMonitorStatus) => {}
            Err(reason) => trace!(line = idx + 1, %reason, "skipping feed line"),
        }
    }
    records
}

/// Parses a single feed line.
///
/// # Errors
///
/// Returns the [`LineRejection`] describing why the line is not a usable sample.
pub fn parse_line(line: &str) -> Result<MonitorRecord, LineRejection> {
    let rest = line
        .trim()
        .strip_prefix(METRIC_PREFIX)
        .ok_or(LineRejection::NotMonitorStatus)?;

    let close = closing_brace(rest).ok_or(LineRejection::UnterminatedLabels)?;
    let (labels, tail) = (&rest[..close], &rest[close + 1..]);

    // A trailing exposition timestamp may follow the value.
    let raw_value = tail.split_whitespace().next().ok_or(LineRejection::MissingValue)?;
    let code: i64 = raw_value
        .parse()
        .map_err(|_| LineRejection::InvalidStatus(raw_value.to_string()))?;

    let mut name = None;
    let mut record = MonitorRecord::new(String::new(), MonitorStatus::from_code(code));
    for (key, value) in split_labels(labels) {
        match key.as_str() {
            "monitor_name" => name = Some(value),
            "monitor_type" => record.monitor_type = Some(value),
            "monitor_url" => record.url = Some(value),
            "monitor_hostname" => record.hostname = Some(value),
            "monitor_port" => record.port = Some(value),
            _ => {}
        }
    }

    record.name = name.ok_or(LineRejection::MissingName)?;
    Ok(record)
}

/// Byte offset of the `}` closing the label set, ignoring braces inside quotes.
fn closing_brace(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '}' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits `a="1", b = "2"` into trimmed key/value pairs.
///
/// Commas inside quoted values do not split. Segments without `=` are dropped.
fn split_labels(labels: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in labels.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                segments.push(&labels[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&labels[start..]);

    segments
        .into_iter()
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    if !inner.contains('\\') {
        return inner.to_string();
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
