//! Enrichment seam
//!
//! An external classifier may attach a label to a queued decision. It runs
//! off the lifecycle path; a missing or slow classifier never blocks
//! approve/deny/defer.

use serde::{Deserialize, Serialize};

use super::decision::DecisionCard;

/// Classifier output attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub label: String,
    pub rationale: String,
    /// Name of the classifier that produced it.
    pub classifier: String,
}

/// External classifier.
pub trait Enricher: Send + Sync {
    /// Classify a card. `None` means nothing to add.
    fn classify(&self, card: &DecisionCard) -> Option<Enrichment>;
}

/// Labels a card from its cost, reversibility and blast radius alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskLabelEnricher;

impl Enricher for RiskLabelEnricher {
    fn classify(&self, card: &DecisionCard) -> Option<Enrichment> {
        use super::decision::{BlastRadius, Reversibility};
        use crate::budget::DecisionCost;

        let label = match (card.decision_cost, card.reversibility, card.blast_radius) {
            (DecisionCost::High, Reversibility::Irreversible, _) => "critical",
            (_, _, BlastRadius::Global) => "critical",
            (DecisionCost::High, _, _) => "elevated",
            (_, Reversibility::Irreversible, _) => "elevated",
            _ => "routine",
        };

        Some(Enrichment {
            label: label.to_string(),
            rationale: format!(
                "cost={} reversibility={:?} blast_radius={:?}",
                card.decision_cost, card.reversibility, card.blast_radius
            ),
            classifier: "risk_label".to_string(),
        })
    }
}
