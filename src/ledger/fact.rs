//! Fact records
//!
//! A fact is immutable once appended. Its exported shape is
//! `{seq, event_type, subject_id, value, source, timestamp}`. Input events
//! keep the caller's event type verbatim. Engine-produced facts use the
//! kinds below.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// 1-based insertion index.
    #[serde(default)]
    pub seq: u64,
    pub event_type: String,
    pub subject_id: String,
    pub value: Value,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl Fact {
    /// Whether this fact is of the given engine kind.
    pub fn is(&self, kind: FactKind) -> bool {
        self.event_type == kind.as_str()
    }

    /// Engine kind, if the event type is one.
    pub fn kind(&self) -> Option<FactKind> {
        FactKind::parse(&self.event_type)
    }

    /// String field of `value`, if present.
    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }
}

/// Fact types written by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactKind {
    DecisionApproved,
    DecisionDenied,
    DecisionDeferred,
    DecisionEnriched,
    BudgetExceeded,
    TtlExpired,
    RuleStarted,
    RuleKilled,
    RiskCleared,
    InputIgnored,
}

impl FactKind {
    pub const ALL: [FactKind; 10] = [
        FactKind::DecisionApproved,
        FactKind::DecisionDenied,
        FactKind::DecisionDeferred,
        FactKind::DecisionEnriched,
        FactKind::BudgetExceeded,
        FactKind::TtlExpired,
        FactKind::RuleStarted,
        FactKind::RuleKilled,
        FactKind::RiskCleared,
        FactKind::InputIgnored,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::DecisionApproved => "DECISION_APPROVED",
            FactKind::DecisionDenied => "DECISION_DENIED",
            FactKind::DecisionDeferred => "DECISION_DEFERRED",
            FactKind::DecisionEnriched => "DECISION_ENRICHED",
            FactKind::BudgetExceeded => "BUDGET_EXCEEDED",
            FactKind::TtlExpired => "TTL_EXPIRED",
            FactKind::RuleStarted => "RULE_STARTED",
            FactKind::RuleKilled => "RULE_KILLED",
            FactKind::RiskCleared => "RISK_CLEARED",
            FactKind::InputIgnored => "INPUT_IGNORED",
        }
    }

    /// Reverse of `as_str`.
    pub fn parse(s: &str) -> Option<FactKind> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Component that wrote a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactSource {
    Workflow,
    BudgetGate,
    TtlScheduler,
    InputValidator,
    Enricher,
}

impl FactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactSource::Workflow => "workflow",
            FactSource::BudgetGate => "budget_gate",
            FactSource::TtlScheduler => "ttl_scheduler",
            FactSource::InputValidator => "input_validator",
            FactSource::Enricher => "enricher",
        }
    }
}

impl fmt::Display for FactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
