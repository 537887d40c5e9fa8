//! Observable events for ledgergate
//!
//! Every log line the engine emits names one of these events.
//! Events are explicit and typed.

use std::fmt;

/// Observable events
///
/// Covers:
/// - Service lifecycle
/// - Decision lifecycle
/// - Rules and navigation
/// - Input and export plumbing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Service lifecycle
    /// Service boot begins
    ServiceStart,
    /// Service ready to accept lifecycle calls
    ServiceReady,
    /// Service shutting down
    ServiceStop,
    /// Configuration loaded and validated
    ConfigLoaded,

    // Decision lifecycle
    /// A decision card entered the queue
    DecisionQueued,
    /// Approval ritual started
    ApprovalStarted,
    /// Decision approved after the budget step
    DecisionApproved,
    /// Decision denied (manually or by budget)
    DecisionDenied,
    /// Decision re-queued with a fresh deadline
    DecisionDeferred,
    /// Enrichment attached to a queued decision
    DecisionEnriched,
    /// High-cost approval refused by the weekly cap
    BudgetExceeded,
    /// TTL sweep expired a decision
    TtlExpired,

    // Rules & navigation
    /// Rule started
    RuleStarted,
    /// Rule killed
    RuleKilled,
    /// Kill settle timer returned navigation to entry
    KillSettled,
    /// Friction threshold crossed, jumped to escalation page
    RiskSpike,
    /// Escalation acknowledged, navigation restored
    RiskCleared,
    /// Manual navigation refused by the page registry
    NavigationRejected,
    /// Lifecycle call skipped on a failed precondition
    ActionSkipped,

    // Input & export
    /// Raw input rejected by the schema
    InputIgnored,
    /// Live projection disagrees with ledger replay
    ProjectionMismatch,
    /// Fact exporter failed to write
    ExportFailed,
    /// Enrichment task panicked or was cancelled
    EnrichmentFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServiceStart => "LEDGERGATE_STARTUP_BEGIN",
            Event::ServiceReady => "LEDGERGATE_READY",
            Event::ServiceStop => "LEDGERGATE_SHUTDOWN",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::DecisionQueued => "DECISION_QUEUED",
            Event::ApprovalStarted => "APPROVAL_STARTED",
            Event::DecisionApproved => "DECISION_APPROVED",
            Event::DecisionDenied => "DECISION_DENIED",
            Event::DecisionDeferred => "DECISION_DEFERRED",
            Event::DecisionEnriched => "DECISION_ENRICHED",
            Event::BudgetExceeded => "BUDGET_EXCEEDED",
            Event::TtlExpired => "TTL_EXPIRED",

            Event::RuleStarted => "RULE_STARTED",
            Event::RuleKilled => "RULE_KILLED",
            Event::KillSettled => "KILL_SETTLED",
            Event::RiskSpike => "RISK_SPIKE",
            Event::RiskCleared => "RISK_CLEARED",
            Event::NavigationRejected => "NAVIGATION_REJECTED",
            Event::ActionSkipped => "ACTION_SKIPPED",

            Event::InputIgnored => "INPUT_IGNORED",
            Event::ProjectionMismatch => "PROJECTION_MISMATCH",
            Event::ExportFailed => "EXPORT_FAILED",
            Event::EnrichmentFailed => "ENRICHMENT_FAILED",
        }
    }

    /// Returns true if this event indicates an operator-visible failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::ProjectionMismatch | Event::ExportFailed | Event::EnrichmentFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
