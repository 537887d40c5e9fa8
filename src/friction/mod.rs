//! Friction monitor
//!
//! Counts friction signals from ledger appends and asks for an escalation
//! jump once the configured policy says the threshold is crossed.
//!
//! Counters never decrease within a window. The monitor never asks for a
//! jump while the machine already sits on the friction page.

mod policy;

pub use policy::{FrictionPolicy, ThresholdPolicy};

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::Fact;
use crate::navigation::PageId;

/// Category a fact may count toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionCategory {
    Questions,
    Interventions,
    Exceptions,
    Escalations,
}

impl FrictionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrictionCategory::Questions => "questions",
            FrictionCategory::Interventions => "interventions",
            FrictionCategory::Exceptions => "exceptions",
            FrictionCategory::Escalations => "escalations",
        }
    }
}

impl fmt::Display for FrictionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionDelta {
    pub questions: u64,
    pub interventions: u64,
    pub exceptions: u64,
    pub escalations: u64,
    pub computed_at: Option<DateTime<Utc>>,
}

impl FrictionDelta {
    /// Bump one counter and stamp the time.
    pub fn record(&mut self, category: FrictionCategory, at: DateTime<Utc>) {
        match category {
            FrictionCategory::Questions => self.questions += 1,
            FrictionCategory::Interventions => self.interventions += 1,
            FrictionCategory::Exceptions => self.exceptions += 1,
            FrictionCategory::Escalations => self.escalations += 1,
        }
        self.computed_at = Some(at);
    }

    pub fn get(&self, category: FrictionCategory) -> u64 {
        match category {
            FrictionCategory::Questions => self.questions,
            FrictionCategory::Interventions => self.interventions,
            FrictionCategory::Exceptions => self.exceptions,
            FrictionCategory::Escalations => self.escalations,
        }
    }
}

/// Event type to category mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrictionRouting {
    categories: HashMap<String, FrictionCategory>,
}

impl FrictionRouting {
    pub fn new(categories: HashMap<String, FrictionCategory>) -> Self {
        Self { categories }
    }

    pub fn category_for(&self, event_type: &str) -> Option<FrictionCategory> {
        self.categories.get(event_type).copied()
    }

    /// Monitored event types.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Fold a fact into `delta`. Returns the category it counted toward.
    pub fn fold(&self, delta: &mut FrictionDelta, fact: &Fact) -> Option<FrictionCategory> {
        let category = self.category_for(&fact.event_type)?;
        delta.record(category, fact.timestamp);
        Some(category)
    }
}

/// What the monitor made of one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrictionSignal {
    /// Event type is not monitored.
    Ignored,
    /// Counted; no jump needed.
    Counted(FrictionCategory),
    /// Counted and the threshold is crossed: fire `RISK_SPIKE`.
    Spike(FrictionCategory),
}

/// The monitor.
pub struct FrictionMonitor {
    delta: FrictionDelta,
    routing: FrictionRouting,
    policy: Box<dyn FrictionPolicy>,
}

impl FrictionMonitor {
    pub fn new(routing: FrictionRouting, policy: Box<dyn FrictionPolicy>) -> Self {
        Self {
            delta: FrictionDelta::default(),
            routing,
            policy,
        }
    }

    /// Observe one appended fact while the machine is on `current_page`.
    pub fn observe(&mut self, fact: &Fact, current_page: PageId) -> FrictionSignal {
        let Some(category) = self.routing.fold(&mut self.delta, fact) else {
            return FrictionSignal::Ignored;
        };

        if current_page != PageId::Friction && self.policy.is_crossed(&self.delta) {
            FrictionSignal::Spike(category)
        } else {
            FrictionSignal::Counted(category)
        }
    }

    pub fn delta(&self) -> FrictionDelta {
        self.delta
    }

    pub fn routing(&self) -> &FrictionRouting {
        &self.routing
    }

    /// Start a new counting window.
    pub fn reset_window(&mut self) {
        self.delta = FrictionDelta::default();
    }
}

impl fmt::Debug for FrictionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrictionMonitor")
            .field("delta", &self.delta)
            .field("routing", &self.routing)
            .finish()
    }
}
