//! Sync engine: the per-category message table and the reconciler.
//!
//! A cycle turns one feed body into at most one send or edit per category.
//! The [`ChannelMessageState`] table is owned by the caller and loaned to
//! each cycle, so tests can start from any fixture table.

/// Create-vs-update reconciliation.
pub mod reconciler;
/// Per-category message table.
pub mod state;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use reconciler::{CategoryOutcome, CyclePlan, CycleReport, Reconciler, SyncRequest};
pub use state::ChannelMessageState;

/// Correlation id for one sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(Uuid);

impl CycleId {
    /// Creates a new random cycle id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
