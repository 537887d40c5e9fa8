//! Lifecycle outcomes
//!
//! Lifecycle methods never return errors. A failed precondition is a
//! `Skipped` with the reason; the caller decides whether to log it.

use std::fmt;

use uuid::Uuid;

use super::input::IgnoreReason;
use crate::ledger::Fact;
use crate::navigation::PageId;

/// Precondition that stopped an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoCurrentDecision,
    NotOnEntryPage { current: PageId },
    NoActiveApproval,
    WrongApprovalStep { current: PageId },
    InvalidDirection(String),
    ApprovalInProgress,
    UnknownDecision(Uuid),
    UnknownRule(Uuid),
    RuleAlreadyKilled(Uuid),
    EmptyRuleName,
    PageNotReachable(PageId),
    NoActiveRisk,
    StaleSettleToken,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::NoCurrentDecision => "no_current_decision",
            SkipReason::NotOnEntryPage { .. } => "not_on_entry_page",
            SkipReason::NoActiveApproval => "no_active_approval",
            SkipReason::WrongApprovalStep { .. } => "wrong_approval_step",
            SkipReason::InvalidDirection(_) => "invalid_direction",
            SkipReason::ApprovalInProgress => "approval_in_progress",
            SkipReason::UnknownDecision(_) => "unknown_decision",
            SkipReason::UnknownRule(_) => "unknown_rule",
            SkipReason::RuleAlreadyKilled(_) => "rule_already_killed",
            SkipReason::EmptyRuleName => "empty_rule_name",
            SkipReason::PageNotReachable(_) => "page_not_reachable",
            SkipReason::NoActiveRisk => "no_active_risk",
            SkipReason::StaleSettleToken => "stale_settle_token",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotOnEntryPage { current } | SkipReason::WrongApprovalStep { current } => {
                write!(f, "{} (on {})", self.code(), current.code())
            }
            SkipReason::InvalidDirection(d) => write!(f, "{}: {:?}", self.code(), d),
            SkipReason::UnknownDecision(id)
            | SkipReason::UnknownRule(id)
            | SkipReason::RuleAlreadyKilled(id) => write!(f, "{}: {}", self.code(), id),
            SkipReason::PageNotReachable(page) => write!(f, "{}: {}", self.code(), page.code()),
            _ => write!(f, "{}", self.code()),
        }
    }
}

/// Result of a lifecycle action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Action took effect. Navigation-only actions carry no facts.
    Applied(Vec<Fact>),
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// Facts appended by the action.
    pub fn facts(&self) -> &[Fact] {
        match self {
            Outcome::Applied(facts) => facts,
            Outcome::Skipped(_) => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }
}

/// Result of `process_input`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    Accepted {
        fact: Fact,
        /// Decision opened by this input, if any.
        queued: Option<Uuid>,
    },
    Ignored {
        reason: IgnoreReason,
        fact: Fact,
    },
}

impl InputOutcome {
    pub fn fact(&self) -> &Fact {
        match self {
            InputOutcome::Accepted { fact, .. } | InputOutcome::Ignored { fact, .. } => fact,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, InputOutcome::Accepted { .. })
    }

    pub fn queued(&self) -> Option<Uuid> {
        match self {
            InputOutcome::Accepted { queued, .. } => *queued,
            InputOutcome::Ignored { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_has_no_facts() {
        let outcome = Outcome::Skipped(SkipReason::NoCurrentDecision);
        assert!(!outcome.is_applied());
        assert!(outcome.facts().is_empty());
        assert_eq!(outcome.skip_reason().map(|r| r.code()), Some("no_current_decision"));
    }

    #[test]
    fn test_skip_display() {
        let reason = SkipReason::PageNotReachable(PageId::Friction);
        assert_eq!(reason.to_string(), "page_not_reachable: P5");
        let reason = SkipReason::NotOnEntryPage { current: PageId::Ledger };
        assert_eq!(reason.to_string(), "not_on_entry_page (on P2)");
    }
}
