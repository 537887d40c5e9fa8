//! Decision workflow
//!
//! The orchestrator and the records it owns:
//! - `DecisionWorkflow`: lifecycle API over queue, rules, budget, friction
//!   and navigation
//! - `DecisionQueue` / `DecisionCard`: pending decisions, FIFO
//! - `RuleRegistry` / `Rule`: started and killed rules
//! - Input validation, outcomes, enrichment seam and snapshot export

mod controller;
mod decision;
mod enrichment;
mod input;
mod outcome;
mod rule;
mod snapshot;

pub use controller::{DecisionWorkflow, PendingReturn};
pub use decision::{BlastRadius, DecisionCard, DecisionQueue, Direction, Reversibility};
pub use enrichment::{Enricher, Enrichment, RiskLabelEnricher};
pub use input::{parse_input, validate_input, IgnoreReason, Rejection, ValidatedInput};
pub use outcome::{InputOutcome, Outcome, SkipReason};
pub use rule::{Rule, RuleRegistry, RuleStatus};
pub use snapshot::WorkflowSnapshot;
