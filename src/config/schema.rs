//! Input schema contract and decision templates.

use serde::{Deserialize, Serialize};

use crate::budget::DecisionCost;
use crate::workflow::{BlastRadius, Reversibility};

/// Fields every raw input must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["event_type", "subject_id", "value", "source"];

/// Shape accepted by `process_input`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
    pub version: String,
    pub allowed_events: Vec<String>,
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
}

fn default_required_fields() -> Vec<String> {
    REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            allowed_events: [
                "PAYMENT_FAILED",
                "ESCALATION_RAISED",
                "MANUAL_INTERVENTION",
                "EXCEPTION_RAISED",
                "QUESTION_ASKED",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            required_fields: default_required_fields(),
        }
    }
}

impl InputSchema {
    pub fn allows(&self, event_type: &str) -> bool {
        self.allowed_events.iter().any(|e| e == event_type)
    }
}

/// How an accepted event becomes a decision card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTemplate {
    pub subject_type: String,
    pub action_type: String,
    pub cost: DecisionCost,
    #[serde(default)]
    pub reversibility: Reversibility,
    #[serde(default)]
    pub blast_radius: BlastRadius,
    /// `{subject_id}` and `{event_type}` are substituted.
    pub summary: String,
}

impl DecisionTemplate {
    pub fn render_summary(&self, event_type: &str, subject_id: &str) -> String {
        self.summary
            .replace("{subject_id}", subject_id)
            .replace("{event_type}", event_type)
    }
}
