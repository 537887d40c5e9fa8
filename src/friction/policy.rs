//! Threshold policies.

use serde::{Deserialize, Serialize};

use super::{FrictionCategory, FrictionDelta};

/// Decides whether a counter set calls for escalation.
pub trait FrictionPolicy: Send + Sync {
    fn is_crossed(&self, delta: &FrictionDelta) -> bool;
}

/// Per-category thresholds; any counter at or above its threshold crosses.
/// `None` disables a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    #[serde(default)]
    pub questions: Option<u64>,
    #[serde(default)]
    pub interventions: Option<u64>,
    #[serde(default)]
    pub exceptions: Option<u64>,
    #[serde(default)]
    pub escalations: Option<u64>,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            questions: None,
            interventions: Some(5),
            exceptions: Some(3),
            escalations: Some(1),
        }
    }
}

impl ThresholdPolicy {
    /// Policy that never crosses.
    pub fn disabled() -> Self {
        Self {
            questions: None,
            interventions: None,
            exceptions: None,
            escalations: None,
        }
    }

    pub fn threshold(&self, category: FrictionCategory) -> Option<u64> {
        match category {
            FrictionCategory::Questions => self.questions,
            FrictionCategory::Interventions => self.interventions,
            FrictionCategory::Exceptions => self.exceptions,
            FrictionCategory::Escalations => self.escalations,
        }
    }

    /// Configured thresholds, for validation.
    pub fn thresholds(&self) -> impl Iterator<Item = (FrictionCategory, u64)> + '_ {
        [
            FrictionCategory::Questions,
            FrictionCategory::Interventions,
            FrictionCategory::Exceptions,
            FrictionCategory::Escalations,
        ]
        .into_iter()
        .filter_map(|c| self.threshold(c).map(|t| (c, t)))
    }
}

impl FrictionPolicy for ThresholdPolicy {
    fn is_crossed(&self, delta: &FrictionDelta) -> bool {
        self.thresholds().any(|(c, t)| delta.get(c) >= t)
    }
}
