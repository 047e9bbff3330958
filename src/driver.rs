//! Sync driver: owns the message table and runs cycles on a fixed period.
//!
//! Cycles never overlap. Each tick awaits a full cycle (resolve guild and
//! channel, fetch the feed, reconcile) before the next tick is considered.
//! Every failure after startup degrades to "try again next cycle".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, info_span, warn, Instrument};

use crate::error::{SyncError, SyncResult, TransportError};
use crate::feed::FeedSource;
use crate::sync::{ChannelMessageState, CycleId, CycleReport, Reconciler};
use crate::transport::{ChatTransport, GuildId};

/// Periodic status sync for one channel.
pub struct StatusSync {
    transport: Arc<dyn ChatTransport>,
    feed: Arc<dyn FeedSource>,
    reconciler: Reconciler,
    guild: GuildId,
    period: Duration,
    state: ChannelMessageState,
}

impl StatusSync {
    /// Creates a driver with every category untracked.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        feed: Arc<dyn FeedSource>,
        reconciler: Reconciler,
        guild: GuildId,
        period: Duration,
    ) -> Self {
        let state = reconciler.initial_state();
        Self {
            transport,
            feed,
            reconciler,
            guild,
            period,
            state,
        }
    }

    /// Current message table.
    #[must_use]
    pub fn state(&self) -> &ChannelMessageState {
        &self.state
    }

    /// Time between cycles.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// One-time startup: wipe the channel's existing history.
    ///
    /// Failures are logged and do not prevent polling. The message table is
    /// not touched.
    pub async fn startup(&mut self) {
        let channel = self.reconciler.channel().clone();
        match self.transport.fetch_channel(&channel).await {
            Ok(Some(info)) if info.text_based => match self.transport.clear_channel_history(&channel).await {
                Ok(deleted) => info!(%channel, deleted, "Cleared channel"),
                Err(e) => error!(%channel, error = %e, "Error clearing channel"),
            },
            Ok(_) => error!(%channel, "Unable to find text channel with ID {channel}"),
            Err(e) => error!(%channel, error = %e, "Unable to fetch channel"),
        }
    }

    /// Runs one full cycle.
    ///
    /// # Errors
    ///
    /// Returns the fetch or transport error that aborted the cycle before any
    /// message was touched. Per-category failures are reported in the
    /// [`CycleReport`] instead.
    pub async fn run_cycle(&mut self) -> SyncResult<CycleReport> {
        let cycle = CycleId::new();
        let span = info_span!("sync_cycle", cycle = %cycle);
        self.cycle_inner(cycle).instrument(span).await
    }

    async fn cycle_inner(&mut self, cycle: CycleId) -> SyncResult<CycleReport> {
        self.resolve_target().await?;

        let body = self.feed.fetch().await?.into_body()?;

        let report = self
            .reconciler
            .run_cycle(self.transport.as_ref(), &body, &mut self.state, cycle)
            .await;
        if report.failed() > 0 {
            warn!(failed = report.failed(), "cycle finished with failures");
        }
        Ok(report)
    }

    async fn resolve_target(&self) -> SyncResult<()> {
        if self.transport.fetch_guild(&self.guild).await?.is_none() {
            return Err(TransportError::GuildUnavailable {
                id: self.guild.to_string(),
            }
            .into());
        }

        let channel = self.reconciler.channel();
        match self.transport.fetch_channel(channel).await? {
            Some(info) if info.text_based => Ok(()),
            _ => Err(TransportError::ChannelUnavailable {
                id: channel.to_string(),
            }
            .into()),
        }
    }

    /// Runs one cycle and logs (instead of returning) an aborting error.
    pub async fn tick(&mut self) -> Option<CycleReport> {
        match self.run_cycle().await {
            Ok(report) => Some(report),
            Err(e) => {
                log_aborted(&e);
                None
            }
        }
    }

    /// Runs `startup`, then a cycle immediately and every period until
    /// `shutdown` resolves. Returns the number of cycles started.
    pub async fn run<S>(&mut self, shutdown: S) -> u64
    where
        S: Future<Output = ()>,
    {
        self.startup().await;

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    cycles += 1;
                    self.tick().await;
                }
            }
        }
        info!(cycles, "status sync stopped");
        cycles
    }
}

fn log_aborted(e: &SyncError) {
    if e.is_retryable() {
        warn!(error = %e, "cycle aborted; retrying next cycle");
    } else {
        error!(error = %e, "cycle aborted");
    }
}
