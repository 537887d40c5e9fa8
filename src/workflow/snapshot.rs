//! Exported workflow state
//!
//! Ordered facts plus the model state at the moment of export. Export only:
//! a snapshot is never loaded back into a live workflow, but it can be
//! replayed to check its counters against its own facts.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::DecisionCard;
use super::rule::Rule;
use crate::budget::WeeklyBudget;
use crate::friction::{FrictionDelta, FrictionRouting};
use crate::ledger::{ExportResult, Fact, LedgerProjection, Reconciliation};
use crate::navigation::NavigationState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub taken_at: DateTime<Utc>,
    pub navigation: NavigationState,
    pub queue: Vec<DecisionCard>,
    pub rules: Vec<Rule>,
    pub budget: WeeklyBudget,
    pub friction: FrictionDelta,
    /// Last fact seq before the current friction window.
    #[serde(default)]
    pub friction_window_from: u64,
    pub facts: Vec<Fact>,
}

impl WorkflowSnapshot {
    pub fn write_to(&self, path: &Path) -> ExportResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> ExportResult<Self> {
        let content = fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Replay the facts and compare against the stored counters.
    pub fn replay(&self, routing: &FrictionRouting) -> Reconciliation {
        LedgerProjection::replay_from(
            &self.facts,
            routing,
            &self.budget,
            self.friction_window_from,
        )
        .reconcile(&self.friction, self.budget.high_decisions_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friction::FrictionCategory;
    use chrono::Duration;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn snapshot() -> WorkflowSnapshot {
        let now = Utc::now();
        WorkflowSnapshot {
            taken_at: now,
            navigation: NavigationState::new(),
            queue: Vec::new(),
            rules: Vec::new(),
            budget: WeeklyBudget {
                high_decisions_used: 0,
                high_decisions_cap: 3,
                week_start: now - Duration::hours(1),
                week_end: now + Duration::days(6),
            },
            friction: FrictionDelta {
                exceptions: 1,
                computed_at: Some(now),
                ..FrictionDelta::default()
            },
            friction_window_from: 0,
            facts: vec![Fact {
                seq: 1,
                event_type: "EXCEPTION_RAISED".to_string(),
                subject_id: "job-4".to_string(),
                value: serde_json::Value::Null,
                source: "scheduler".to_string(),
                timestamp: now,
            }],
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snap = snapshot();
        snap.write_to(&path).unwrap();
        assert_eq!(WorkflowSnapshot::read_from(&path).unwrap(), snap);
    }

    #[test]
    fn test_replay_matches_stored_counters() {
        let routing = FrictionRouting::new(HashMap::from([(
            "EXCEPTION_RAISED".to_string(),
            FrictionCategory::Exceptions,
        )]));
        assert!(snapshot().replay(&routing).is_consistent());
    }

    #[test]
    fn test_replay_detects_tampered_counter() {
        let mut snap = snapshot();
        snap.budget.high_decisions_used = 2;
        let r = snap.replay(&FrictionRouting::default());
        assert!(!r.is_consistent());
    }
}
