//! Create-vs-update reconciliation of category messages.
//!
//! Per category and cycle:
//! - untracked: send, then track the returned id
//! - tracked `m`: fetch `m`; if it exists edit it in place, otherwise send a
//!   replacement and track the new id
//!
//! Any transport failure leaves that category's entry untouched and does not
//! stop the other categories. The next cycle retries.

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use tracing::{error, info};

use crate::category::{categorize, CategorySpec};
use crate::error::TransportError;
use crate::feed::parse_feed;
use crate::filter::FilterMatcher;
use crate::render::{render_summary, StatusSummary};
use crate::transport::{ChannelId, ChatTransport, MessageId};

use super::state::ChannelMessageState;
use super::CycleId;

/// A transport request produced by planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Post a new message for an untracked category.
    Send {
        /// Category title.
        category: String,
        /// Rendered content.
        content: StatusSummary,
    },
    /// Verify a tracked message still exists, then edit it (or replace it).
    Refresh {
        /// Category title.
        category: String,
        /// Tracked message.
        message: MessageId,
        /// Rendered content.
        content: StatusSummary,
    },
}

impl SyncRequest {
    /// Category this request belongs to.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Send { category, .. } | Self::Refresh { category, .. } => category,
        }
    }

    /// Content to publish.
    #[must_use]
    pub fn content(&self) -> &StatusSummary {
        match self {
            Self::Send { content, .. } | Self::Refresh { content, .. } => content,
        }
    }
}

/// Planned work for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclePlan {
    /// Requests in category order.
    pub requests: Vec<SyncRequest>,
    /// Categories with no matching monitor this cycle.
    pub skipped: Vec<String>,
    /// Number of monitors parsed from the feed.
    pub monitors: usize,
}

/// What happened to one category in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// First message for the category.
    Sent {
        /// New message.
        message: MessageId,
    },
    /// The tracked message had disappeared and was replaced.
    Resent {
        /// Message that could no longer be found.
        previous: MessageId,
        /// Replacement message.
        message: MessageId,
    },
    /// The tracked message was edited in place.
    Updated {
        /// Edited message.
        message: MessageId,
    },
    /// No monitor matched; nothing was touched.
    Skipped,
    /// A transport call failed; state left unchanged.
    Failed {
        /// Error description.
        error: String,
    },
}

impl fmt::Display for CategoryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { message } => write!(f, "sent {message}"),
            Self::Resent { previous, message } => write!(f, "resent {message} (replacing {previous})"),
            Self::Updated { message } => write!(f, "updated {message}"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Result of one executed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle correlation id.
    pub cycle: CycleId,
    /// Outcome per category, in configuration order.
    pub outcomes: Vec<(String, CategoryOutcome)>,
}

impl CycleReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(cycle: CycleId) -> Self {
        Self {
            cycle,
            outcomes: Vec::new(),
        }
    }

    /// Outcome for `category`, if it was processed.
    #[must_use]
    pub fn outcome(&self, category: &str) -> Option<&CategoryOutcome> {
        self.outcomes
            .iter()
            .find(|(title, _)| title == category)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&CategoryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Messages created (first sends and replacements).
    #[must_use]
    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Sent { .. } | CategoryOutcome::Resent { .. }))
    }

    /// Messages edited in place.
    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Updated { .. }))
    }

    /// Categories skipped for lack of matches.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Skipped))
    }

    /// Categories whose transport calls failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CategoryOutcome::Failed { .. }))
    }
}

/// Plans and executes sync cycles for one channel.
#[derive(Debug, Clone)]
pub struct Reconciler {
    channel: ChannelId,
    categories: Vec<CategorySpec>,
    matcher: FilterMatcher,
    link: String,
}

impl Reconciler {
    /// Creates a reconciler for `channel`.
    #[must_use]
    pub fn new(
        channel: ChannelId,
        categories: Vec<CategorySpec>,
        matcher: FilterMatcher,
        link: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            categories,
            matcher,
            link: link.into(),
        }
    }

    /// Target channel.
    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Configured categories, in order.
    #[must_use]
    pub fn categories(&self) -> &[CategorySpec] {
        &self.categories
    }

    /// Fresh state table with every configured category untracked.
    #[must_use]
    pub fn initial_state(&self) -> ChannelMessageState {
        ChannelMessageState::new(self.categories.iter().map(|c| c.title.clone()))
    }

    /// Turns a feed body into transport requests without touching anything.
    #[must_use]
    pub fn plan<Tz: TimeZone>(
        &self,
        feed_body: &str,
        state: &ChannelMessageState,
        updated_at: &DateTime<Tz>,
    ) -> CyclePlan
    where
        Tz::Offset: fmt::Display,
    {
        let records = parse_feed(feed_body);
        let mut plan = CyclePlan {
            monitors: records.len(),
            ..CyclePlan::default()
        };

        for matched in categorize(&records, &self.categories, &self.matcher) {
            let category = matched.title().to_string();
            if matched.is_empty() {
                info!("No matches for \"{category}\", skipping");
                plan.skipped.push(category);
                continue;
            }

            let content = render_summary(&category, &matched.monitors, &self.link, updated_at);
            let request = match state.tracked(&category) {
                Some(message) => SyncRequest::Refresh {
                    category,
                    message: message.clone(),
                    content,
                },
                None => SyncRequest::Send { category, content },
            };
            plan.requests.push(request);
        }
        plan
    }

    /// Executes planned requests, updating `state` after each successful send.
    pub async fn execute(
        &self,
        transport: &dyn ChatTransport,
        state: &mut ChannelMessageState,
        plan: CyclePlan,
        cycle: CycleId,
    ) -> CycleReport {
        let mut report = CycleReport::new(cycle);
        let mut skipped = plan.skipped.into_iter().peekable();

        // Keep configuration order across skipped and active categories.
        let mut requests = plan.requests.into_iter().peekable();
        for category in &self.categories {
            let title = category.title.as_str();
            if skipped.peek().is_some_and(|s| s == title) {
                skipped.next();
                report.outcomes.push((title.to_string(), CategoryOutcome::Skipped));
                continue;
            }
            if requests.peek().is_some_and(|r| r.category() == title) {
                if let Some(request) = requests.next() {
                    let outcome = self.apply(transport, state, request).await;
                    report.outcomes.push((title.to_string(), outcome));
                }
            }
        }
        // Requests for titles outside the configured list (hand-built plans).
        for request in requests {
            let title = request.category().to_string();
            let outcome = self.apply(transport, state, request).await;
            report.outcomes.push((title, outcome));
        }
        report
    }

    /// Plans and executes one cycle against `feed_body`, stamped with local time.
    pub async fn run_cycle(
        &self,
        transport: &dyn ChatTransport,
        feed_body: &str,
        state: &mut ChannelMessageState,
        cycle: CycleId,
    ) -> CycleReport {
        let plan = self.plan(feed_body, state, &Local::now());
        self.execute(transport, state, plan, cycle).await
    }

    async fn apply(
        &self,
        transport: &dyn ChatTransport,
        state: &mut ChannelMessageState,
        request: SyncRequest,
    ) -> CategoryOutcome {
        let category = request.category().to_string();
        let result = match request {
            SyncRequest::Send { content, .. } => self
                .send(transport, state, &category, &content)
                .await
                .map(|message| CategoryOutcome::Sent { message }),
            SyncRequest::Refresh { message, content, .. } => {
                self.refresh(transport, state, &category, message, &content).await
            }
        };

        result.unwrap_or_else(|e| {
            error!(category = %category, error = %e, "Failed to send/update {category} monitors message");
            CategoryOutcome::Failed { error: e.to_string() }
        })
    }

    async fn send(
        &self,
        transport: &dyn ChatTransport,
        state: &mut ChannelMessageState,
        category: &str,
        content: &StatusSummary,
    ) -> Result<MessageId, TransportError> {
        let message = transport.send_message(&self.channel, content).await?;
        state.track(category, message.clone());
        info!(category, message = %message, "Sent {category} monitors message");
        Ok(message)
    }

    async fn refresh(
        &self,
        transport: &dyn ChatTransport,
        state: &mut ChannelMessageState,
        category: &str,
        message: MessageId,
        content: &StatusSummary,
    ) -> Result<CategoryOutcome, TransportError> {
        if transport.fetch_message(&self.channel, &message).await?.is_some() {
            transport.edit_message(&self.channel, &message, content).await?;
            info!(category, message = %message, "Updated {category} monitors message");
            return Ok(CategoryOutcome::Updated { message });
        }

        let replacement = transport.send_message(&self.channel, content).await?;
        state.track(category, replacement.clone());
        info!(
            category,
            previous = %message,
            message = %replacement,
            "Sent new {category} monitors message"
        );
        Ok(CategoryOutcome::Resent {
            previous: message,
            message: replacement,
        })
    }
}
