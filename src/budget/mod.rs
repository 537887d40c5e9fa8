//! Budget gate
//!
//! A capped weekly counter of high-cost approvals.
//!
//! - LOW cost always passes
//! - HIGH cost passes only while `used < cap`, and consumption happens in
//!   the same atomic step as the check
//! - A refusal never changes `used`
//! - Resetting the window is the caller's job

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cost class of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionCost {
    Low,
    High,
}

impl DecisionCost {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionCost::Low => "LOW",
            DecisionCost::High => "HIGH",
        }
    }
}

impl fmt::Display for DecisionCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of `try_consume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Allowed,
    Denied { used: u32, cap: u32 },
}

impl BudgetDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BudgetDecision::Allowed)
    }
}

/// Serializable view of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyBudget {
    pub high_decisions_used: u32,
    pub high_decisions_cap: u32,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
}

impl WeeklyBudget {
    /// Whether `at` falls inside `[week_start, week_end)`.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.week_start && at < self.week_end
    }
}

/// The gate.
#[derive(Debug)]
pub struct BudgetGate {
    used: AtomicU32,
    cap: u32,
    week_start: DateTime<Utc>,
    week_end: DateTime<Utc>,
}

impl BudgetGate {
    /// Fresh gate for the seven days starting at `week_start`.
    pub fn new(cap: u32, week_start: DateTime<Utc>) -> Self {
        Self {
            used: AtomicU32::new(0),
            cap,
            week_start,
            week_end: week_start + Duration::days(7),
        }
    }

    /// Check and consume in one step.
    pub fn try_consume(&self, cost: DecisionCost) -> BudgetDecision {
        if cost == DecisionCost::Low {
            return BudgetDecision::Allowed;
        }

        let cap = self.cap;
        match self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < cap).then_some(used + 1)
            }) {
            Ok(_) => BudgetDecision::Allowed,
            Err(used) => BudgetDecision::Denied { used, cap },
        }
    }

    /// Start a new window. Called by whoever owns the calendar.
    pub fn reset(&mut self, week_start: DateTime<Utc>, week_end: DateTime<Utc>) {
        self.used.store(0, Ordering::Release);
        self.week_start = week_start;
        self.week_end = week_end;
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Acquire)
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// High-cost approvals left in this window.
    pub fn remaining(&self) -> u32 {
        self.cap.saturating_sub(self.used())
    }

    pub fn snapshot(&self) -> WeeklyBudget {
        WeeklyBudget {
            high_decisions_used: self.used(),
            high_decisions_cap: self.cap,
            week_start: self.week_start,
            week_end: self.week_end,
        }
    }
}
