//! TTL scheduler
//!
//! - A card expires when its deadline is strictly before the sweep time
//! - Expired cards leave the queue in queue order
//! - A card removed by approve/deny is gone from the queue, so a later
//!   sweep can never expire it
//!
//! The scheduler only selects. The workflow appends `TTL_EXPIRED` and
//! drives navigation for each card it returns.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::workflow::{DecisionCard, DecisionQueue};

/// Periodic expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlScheduler {
    interval: Duration,
}

impl TtlScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Sweep period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Remove and return every card expired at `now`.
    pub fn collect_expired(&self, queue: &mut DecisionQueue, now: DateTime<Utc>) -> Vec<DecisionCard> {
        queue.drain_where(|card| card.is_expired(now))
    }

    /// Earliest deadline still in the queue.
    pub fn next_deadline(&self, queue: &DecisionQueue) -> Option<DateTime<Utc>> {
        queue.iter().map(|c| c.deadline).min()
    }
}
