//! Navigation State Machine
//!
//! - States are the nine pages of the registry
//! - The transition function is pure: it returns a new state and never
//!   mutates the old one
//! - Actions are applied strictly in call order; nothing is merged
//! - `previous_page` always records the page the machine left, including
//!   forced and system transitions (audit only, never access control)
//!
//! The only refusal is an unforced `GOTO` to a page without manual access.
//! Every other action is unconditional.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::page::{PageId, PageRegistry};

/// Progress of the two-step approval ritual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveFlow {
    pub active: bool,
    pub long_term_done: bool,
    pub budget_done: bool,
    pub decision_id: Option<Uuid>,
}

/// Saved return address of an automatic escalation jump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskJump {
    pub active: bool,
    pub return_to: Option<PageId>,
}

/// Navigation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    /// Jump to a page. Unforced jumps honour `manual_access`.
    GoTo { page: PageId, force: bool },
    /// Enter the approval ritual for a decision.
    ApproveStart { decision_id: Uuid },
    /// Long-term direction confirmed.
    ApproveLongTermDone,
    /// Budget step finished (approved or denied).
    ApproveBudgetDone,
    /// A rule was killed.
    Kill,
    /// Friction threshold crossed.
    RiskSpike,
    /// Escalation acknowledged.
    RiskCleared,
    /// A decision's deadline passed.
    TtlExpired { decision_id: Uuid },
}

impl NavAction {
    /// Action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            NavAction::GoTo { force: false, .. } => "GOTO",
            NavAction::GoTo { force: true, .. } => "GOTO_FORCED",
            NavAction::ApproveStart { .. } => "APPROVE_START",
            NavAction::ApproveLongTermDone => "APPROVE_LONG_TERM_DONE",
            NavAction::ApproveBudgetDone => "APPROVE_BUDGET_DONE",
            NavAction::Kill => "KILL",
            NavAction::RiskSpike => "RISK_SPIKE",
            NavAction::RiskCleared => "RISK_CLEARED",
            NavAction::TtlExpired { .. } => "TTL_EXPIRED",
        }
    }
}

/// Complete navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_page: PageId,
    pub previous_page: Option<PageId>,
    pub approve_flow: ApproveFlow,
    pub risk_jump: RiskJump,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    /// Initial state: the entry page, nothing in flight.
    pub fn new() -> Self {
        Self {
            current_page: PageId::ENTRY,
            previous_page: None,
            approve_flow: ApproveFlow::default(),
            risk_jump: RiskJump::default(),
        }
    }

    /// Whether `apply` would change anything for this action.
    ///
    /// False only for an unforced `GOTO` to a page without manual access.
    pub fn admits(&self, action: &NavAction) -> bool {
        match action {
            NavAction::GoTo { page, force } => *force || PageRegistry::is_manually_reachable(*page),
            _ => true,
        }
    }

    /// Whether the machine currently sits on one of the two forced steps.
    pub fn in_approval_step(&self) -> bool {
        matches!(
            self.current_page,
            PageId::ApproveLongTerm | PageId::ApproveBudget
        )
    }

    /// Page a `RISK_CLEARED` returns to.
    ///
    /// A forced step is only resumed while its approval flow is still
    /// active; otherwise the return falls back to the entry page.
    pub fn risk_return_target(&self) -> PageId {
        match self.risk_jump.return_to {
            Some(page) if PageRegistry::accessibility(page).forced && !self.approve_flow.active => {
                PageId::ENTRY
            }
            Some(page) => page,
            None => PageId::ENTRY,
        }
    }

    /// Pure transition function.
    pub fn apply(&self, action: &NavAction) -> NavigationState {
        if !self.admits(action) {
            return *self;
        }

        match *action {
            NavAction::GoTo { page, .. } => {
                let mut next = self.move_to(page);
                // Leaving the ritual by a jump abandons it
                if !PageRegistry::accessibility(page).forced {
                    next.approve_flow = ApproveFlow::default();
                }
                next
            }
            NavAction::ApproveStart { decision_id } => {
                let mut next = self.move_to(PageId::ApproveLongTerm);
                next.approve_flow = ApproveFlow {
                    active: true,
                    long_term_done: false,
                    budget_done: false,
                    decision_id: Some(decision_id),
                };
                next
            }
            NavAction::ApproveLongTermDone => {
                let mut next = self.move_to(PageId::ApproveBudget);
                next.approve_flow.long_term_done = true;
                next
            }
            NavAction::ApproveBudgetDone => {
                let mut next = self.move_to(PageId::ENTRY);
                next.approve_flow = ApproveFlow::default();
                next
            }
            NavAction::Kill => self.move_to(PageId::KillReview),
            NavAction::RiskSpike => {
                let return_to = if self.current_page == PageId::Friction {
                    // Already escalated: keep the original return address
                    self.risk_jump.return_to
                } else {
                    Some(self.current_page)
                };
                let mut next = self.move_to(PageId::Friction);
                next.risk_jump = RiskJump {
                    active: true,
                    return_to,
                };
                next
            }
            NavAction::RiskCleared => {
                let mut next = self.move_to(self.risk_return_target());
                next.risk_jump = RiskJump::default();
                next
            }
            NavAction::TtlExpired { decision_id } => {
                let mut next = self.move_to(PageId::KillReview);
                if self.approve_flow.decision_id == Some(decision_id) {
                    next.approve_flow = ApproveFlow::default();
                }
                next
            }
        }
    }

    fn move_to(&self, page: PageId) -> NavigationState {
        NavigationState {
            current_page: page,
            previous_page: Some(self.current_page),
            approve_flow: self.approve_flow,
            risk_jump: self.risk_jump,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goto(page: PageId) -> NavAction {
        NavAction::GoTo { page, force: false }
    }

    #[test]
    fn test_initial_state() {
        let state = NavigationState::new();
        assert_eq!(state.current_page, PageId::Decision);
        assert_eq!(state.previous_page, None);
        assert!(!state.approve_flow.active);
        assert!(!state.risk_jump.active);
    }

    #[test]
    fn test_manual_goto_to_manual_page() {
        let state = NavigationState::new().apply(&goto(PageId::Ledger));
        assert_eq!(state.current_page, PageId::Ledger);
        assert_eq!(state.previous_page, Some(PageId::Decision));
    }

    #[test]
    fn test_manual_goto_to_restricted_pages_is_noop() {
        let start = NavigationState::new();
        for page in [
            PageId::Friction,
            PageId::KillReview,
            PageId::ApproveLongTerm,
            PageId::ApproveBudget,
        ] {
            assert!(!start.admits(&goto(page)));
            assert_eq!(start.apply(&goto(page)), start);
        }
    }

    #[test]
    fn test_forced_goto_reaches_restricted_page() {
        let state = NavigationState::new().apply(&NavAction::GoTo {
            page: PageId::KillReview,
            force: true,
        });
        assert_eq!(state.current_page, PageId::KillReview);
    }

    #[test]
    fn test_approval_ritual_path() {
        let id = Uuid::new_v4();
        let s0 = NavigationState::new();

        let s1 = s0.apply(&NavAction::ApproveStart { decision_id: id });
        assert_eq!(s1.current_page, PageId::ApproveLongTerm);
        assert!(s1.approve_flow.active);
        assert!(!s1.approve_flow.long_term_done);
        assert_eq!(s1.approve_flow.decision_id, Some(id));

        let s2 = s1.apply(&NavAction::ApproveLongTermDone);
        assert_eq!(s2.current_page, PageId::ApproveBudget);
        assert_eq!(s2.previous_page, Some(PageId::ApproveLongTerm));
        assert!(s2.approve_flow.long_term_done);

        let s3 = s2.apply(&NavAction::ApproveBudgetDone);
        assert_eq!(s3.current_page, PageId::Decision);
        assert_eq!(s3.previous_page, Some(PageId::ApproveBudget));
        assert_eq!(s3.approve_flow, ApproveFlow::default());
    }

    #[test]
    fn test_approve_start_resets_sub_flags() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let state = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: first })
            .apply(&NavAction::ApproveLongTermDone)
            .apply(&NavAction::ApproveStart { decision_id: second });
        assert!(!state.approve_flow.long_term_done);
        assert_eq!(state.approve_flow.decision_id, Some(second));
    }

    #[test]
    fn test_goto_out_of_ritual_abandons_it() {
        let state = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: Uuid::new_v4() })
            .apply(&goto(PageId::Ledger));
        assert_eq!(state.current_page, PageId::Ledger);
        assert!(!state.approve_flow.active);
    }

    #[test]
    fn test_kill_from_any_page() {
        for page in [PageId::Decision, PageId::Rules, PageId::Export] {
            let state = NavigationState::new().apply(&goto(page)).apply(&NavAction::Kill);
            assert_eq!(state.current_page, PageId::KillReview);
        }
    }

    #[test]
    fn test_risk_spike_saves_return_address() {
        let state = NavigationState::new()
            .apply(&goto(PageId::Rules))
            .apply(&NavAction::RiskSpike);
        assert_eq!(state.current_page, PageId::Friction);
        assert!(state.risk_jump.active);
        assert_eq!(state.risk_jump.return_to, Some(PageId::Rules));

        let cleared = state.apply(&NavAction::RiskCleared);
        assert_eq!(cleared.current_page, PageId::Rules);
        assert_eq!(cleared.previous_page, Some(PageId::Friction));
        assert_eq!(cleared.risk_jump, RiskJump::default());
    }

    #[test]
    fn test_repeated_spike_keeps_first_return_address() {
        let state = NavigationState::new()
            .apply(&goto(PageId::Budget))
            .apply(&NavAction::RiskSpike)
            .apply(&NavAction::RiskSpike);
        assert_eq!(state.risk_jump.return_to, Some(PageId::Budget));
    }

    #[test]
    fn test_risk_cleared_without_address_goes_to_entry() {
        let state = NavigationState::new()
            .apply(&goto(PageId::Ledger))
            .apply(&NavAction::RiskCleared);
        assert_eq!(state.current_page, PageId::Decision);
    }

    #[test]
    fn test_spike_during_ritual_returns_into_ritual() {
        let state = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: Uuid::new_v4() })
            .apply(&NavAction::RiskSpike)
            .apply(&NavAction::RiskCleared);
        assert_eq!(state.current_page, PageId::ApproveLongTerm);
        assert!(state.approve_flow.active);
    }

    #[test]
    fn test_abandoned_ritual_not_resumed_after_risk() {
        let state = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: Uuid::new_v4() })
            .apply(&NavAction::RiskSpike)
            .apply(&goto(PageId::Ledger));
        assert!(!state.approve_flow.active);
        assert_eq!(state.risk_return_target(), PageId::ENTRY);

        let cleared = state.apply(&NavAction::RiskCleared);
        assert_eq!(cleared.current_page, PageId::ENTRY);
        assert!(!cleared.risk_jump.active);
    }

    #[test]
    fn test_ttl_expired_clears_matching_ritual() {
        let id = Uuid::new_v4();
        let state = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: id })
            .apply(&NavAction::TtlExpired { decision_id: id });
        assert_eq!(state.current_page, PageId::KillReview);
        assert!(!state.approve_flow.active);

        let other = NavigationState::new()
            .apply(&NavAction::ApproveStart { decision_id: id })
            .apply(&NavAction::TtlExpired { decision_id: Uuid::new_v4() });
        assert!(other.approve_flow.active);
    }

    #[test]
    fn test_apply_does_not_mutate_source() {
        let start = NavigationState::new();
        let _ = start.apply(&NavAction::Kill);
        assert_eq!(start, NavigationState::new());
    }
}
