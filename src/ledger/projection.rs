//! Ledger projection
//!
//! Budget usage and friction counters are caches. The ledger is the truth:
//! folding the facts in order must give the same numbers the live
//! components hold. `reconcile` checks exactly that.

use serde::Serialize;

use super::fact::{Fact, FactKind, FactSource};
use crate::budget::{DecisionCost, WeeklyBudget};
use crate::friction::{FrictionDelta, FrictionRouting};

/// Counters derived purely from facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerProjection {
    pub friction: FrictionDelta,
    pub high_decisions_used: u32,
    pub facts_replayed: usize,
}

impl LedgerProjection {
    /// Fold `facts` in order.
    ///
    /// Budget usage counts `DECISION_APPROVED` facts with cost `HIGH` whose
    /// timestamp falls inside `window`.
    pub fn replay(facts: &[Fact], routing: &FrictionRouting, window: &WeeklyBudget) -> Self {
        Self::replay_from(facts, routing, window, 0)
    }

    /// Like `replay`, but friction only counts facts with
    /// `seq > friction_from_seq` (the current friction window).
    pub fn replay_from(
        facts: &[Fact],
        routing: &FrictionRouting,
        window: &WeeklyBudget,
        friction_from_seq: u64,
    ) -> Self {
        let mut projection = LedgerProjection::default();

        for fact in facts {
            if fact.seq > friction_from_seq {
                routing.fold(&mut projection.friction, fact);
            }

            // Only approvals the workflow itself wrote spend budget
            if fact.is(FactKind::DecisionApproved)
                && fact.source == FactSource::Workflow.as_str()
                && fact.value_str("cost") == Some(DecisionCost::High.as_str())
                && window.covers(fact.timestamp)
            {
                projection.high_decisions_used += 1;
            }

            projection.facts_replayed += 1;
        }

        projection
    }

    /// Compare against live caches.
    pub fn reconcile(&self, live_friction: &FrictionDelta, live_used: u32) -> Reconciliation {
        let mut mismatches = Vec::new();

        let pairs = [
            ("questions", self.friction.questions, live_friction.questions),
            ("interventions", self.friction.interventions, live_friction.interventions),
            ("exceptions", self.friction.exceptions, live_friction.exceptions),
            ("escalations", self.friction.escalations, live_friction.escalations),
            (
                "high_decisions_used",
                u64::from(self.high_decisions_used),
                u64::from(live_used),
            ),
        ];

        for (name, replayed, live) in pairs {
            if replayed != live {
                mismatches.push(Mismatch {
                    counter: name,
                    replayed,
                    live,
                });
            }
        }

        Reconciliation {
            projection: *self,
            mismatches,
        }
    }
}

/// One counter that disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub counter: &'static str,
    pub replayed: u64,
    pub live: u64,
}

/// Result of comparing live caches to a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub projection: LedgerProjection,
    pub mismatches: Vec<Mismatch>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}
