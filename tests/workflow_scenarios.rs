//! Workflow Scenario Tests
//!
//! End-to-end lifecycle scenarios through `DecisionWorkflow`:
//! - The two-step approval ritual and its budget outcomes
//! - Friction escalation and acknowledgement
//! - Rule kill, cooldown and settle return
//! - TTL expiry of deferred decisions
//!
//! Time is driven by a `ManualClock`; nothing sleeps.

use std::sync::Arc;

use chrono::Duration;
use ledgergate::budget::DecisionCost;
use ledgergate::clock::{Clock, ManualClock};
use ledgergate::config::WorkflowConfig;
use ledgergate::ledger::FactKind;
use ledgergate::navigation::PageId;
use ledgergate::workflow::{DecisionWorkflow, Outcome, RuleStatus, SkipReason};
use serde_json::{json, Value};

fn setup(config: WorkflowConfig) -> (DecisionWorkflow, ManualClock) {
    let clock = ManualClock::starting_now();
    let wf = DecisionWorkflow::new(config, Arc::new(clock.clone()));
    (wf, clock)
}

fn event(event_type: &str, subject: &str) -> Value {
    json!({
        "event_type": event_type,
        "subject_id": subject,
        "value": {"note": "scenario"},
        "source": "scenario"
    })
}

fn run_ritual(wf: &mut DecisionWorkflow) -> Outcome {
    assert!(wf.approve().is_applied());
    assert!(wf.confirm_long_term("UP").is_applied());
    wf.confirm_budget()
}

fn event_types(wf: &DecisionWorkflow) -> Vec<String> {
    wf.ledger()
        .facts()
        .into_iter()
        .map(|f| f.event_type)
        .collect()
}

// =============================================================================
// Approval Ritual
// =============================================================================

/// Payment failure opens one decision; the ritual walks P1 -> P7 -> P8 -> P1.
#[test]
fn test_payment_failure_approval_walks_forced_pages() {
    let (mut wf, _) = setup(WorkflowConfig::default());

    let outcome = wf.process_input(&event("PAYMENT_FAILED", "acct-42"));
    assert!(outcome.queued().is_some());
    assert_eq!(wf.queue().len(), 1);
    assert_eq!(wf.current_page(), PageId::Decision);

    wf.approve();
    assert_eq!(wf.current_page(), PageId::ApproveLongTerm);
    assert!(wf.navigation().approve_flow.active);

    wf.confirm_long_term("UP");
    assert_eq!(wf.current_page(), PageId::ApproveBudget);
    assert!(wf.navigation().approve_flow.long_term_done);

    let outcome = wf.confirm_budget();
    assert_eq!(wf.current_page(), PageId::Decision);
    assert!(!wf.navigation().approve_flow.active);
    assert!(wf.queue().is_empty());

    let facts = outcome.facts();
    assert_eq!(facts.len(), 1);
    assert!(facts[0].is(FactKind::DecisionApproved));
    assert_eq!(facts[0].value_str("direction"), Some("UP"));
    assert_eq!(facts[0].value_str("cost"), Some("HIGH"));
    assert_eq!(event_types(&wf), vec!["PAYMENT_FAILED", "DECISION_APPROVED"]);
}

/// LOW cost is approved even with a zero-headroom budget.
#[test]
fn test_low_cost_always_approved() {
    let mut config = WorkflowConfig::default();
    config.high_decisions_cap = 1;
    if let Some(t) = config.decision_triggers.get_mut("PAYMENT_FAILED") {
        t.cost = DecisionCost::Low;
    }
    let (mut wf, _) = setup(config);

    for subject in ["a", "b", "c", "d"] {
        wf.process_input(&event("PAYMENT_FAILED", subject));
        let outcome = run_ritual(&mut wf);
        assert!(outcome.facts()[0].is(FactKind::DecisionApproved));
    }
    assert_eq!(wf.budget().high_decisions_used, 0);
    assert_eq!(wf.ledger().count_of("BUDGET_EXCEEDED"), 0);
}

/// HIGH cost at the cap: BUDGET_EXCEEDED then DECISION_DENIED, used unchanged.
#[test]
fn test_high_cost_at_cap_is_denied() {
    let mut config = WorkflowConfig::default();
    config.high_decisions_cap = 2;
    let (mut wf, _) = setup(config);

    for subject in ["a", "b"] {
        wf.process_input(&event("PAYMENT_FAILED", subject));
        run_ritual(&mut wf);
    }
    assert_eq!(wf.budget().high_decisions_used, 2);

    wf.process_input(&event("PAYMENT_FAILED", "c"));
    let outcome = run_ritual(&mut wf);

    let kinds: Vec<_> = outcome.facts().iter().map(|f| f.event_type.as_str()).collect();
    assert_eq!(kinds, vec!["BUDGET_EXCEEDED", "DECISION_DENIED"]);
    assert_eq!(outcome.facts()[1].value_str("reason"), Some("budget_exceeded"));
    assert_eq!(wf.budget().high_decisions_used, 2);
    assert!(wf.queue().is_empty());
    assert_eq!(wf.current_page(), PageId::Decision);
    assert!(!wf.navigation().approve_flow.active);
}

/// Steps out of order are skipped and leave no trace in the ledger.
#[test]
fn test_out_of_order_steps_are_skipped() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.process_input(&event("PAYMENT_FAILED", "acct-1"));
    let before = wf.ledger().len();

    assert_eq!(wf.confirm_long_term("UP"), Outcome::Skipped(SkipReason::NoActiveApproval));
    assert_eq!(wf.confirm_budget(), Outcome::Skipped(SkipReason::NoActiveApproval));
    assert_eq!(wf.ledger().len(), before);
    assert_eq!(wf.current_page(), PageId::Decision);
}

/// Leaving the ritual by manual navigation abandons it.
#[test]
fn test_manual_goto_abandons_ritual() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.process_input(&event("PAYMENT_FAILED", "acct-1"));
    wf.approve();

    assert!(wf.go_to_page(PageId::Ledger).is_applied());
    assert!(!wf.navigation().approve_flow.active);
    assert_eq!(wf.queue().len(), 1);

    wf.go_to_page(PageId::Decision);
    assert!(wf.approve().is_applied());
}

// =============================================================================
// Friction Escalation
// =============================================================================

/// One escalation with threshold 1 jumps to the friction page.
#[test]
fn test_escalation_jumps_to_friction_page() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.go_to_page(PageId::Rules);

    wf.process_input(&event("ESCALATION_RAISED", "team-ops"));

    assert_eq!(wf.friction().escalations, 1);
    assert!(wf.friction().computed_at.is_some());
    assert_eq!(wf.current_page(), PageId::Friction);
    let jump = wf.navigation().risk_jump;
    assert!(jump.active);
    assert_eq!(jump.return_to, Some(PageId::Rules));
}

/// While escalated, further signals count but do not move the return address.
#[test]
fn test_no_second_jump_while_escalated() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.process_input(&event("ESCALATION_RAISED", "team-ops"));
    wf.process_input(&event("ESCALATION_RAISED", "team-ops"));

    assert_eq!(wf.friction().escalations, 2);
    assert_eq!(wf.current_page(), PageId::Friction);
    assert_eq!(wf.navigation().previous_page, Some(PageId::Decision));
    assert_eq!(wf.navigation().risk_jump.return_to, Some(PageId::Decision));
}

/// Acknowledging the risk appends RISK_CLEARED and returns to the saved page.
#[test]
fn test_acknowledge_returns_to_saved_page() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.go_to_page(PageId::Budget);
    wf.process_input(&event("ESCALATION_RAISED", "team-ops"));

    let outcome = wf.acknowledge_risk();
    assert!(outcome.facts()[0].is(FactKind::RiskCleared));
    assert_eq!(wf.current_page(), PageId::Budget);
    assert!(!wf.navigation().risk_jump.active);
}

/// A spike in the middle of the ritual returns to the same forced step.
#[test]
fn test_spike_during_ritual_resumes_step() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.process_input(&event("PAYMENT_FAILED", "acct-1"));
    wf.approve();

    wf.process_input(&event("ESCALATION_RAISED", "team-ops"));
    assert_eq!(wf.current_page(), PageId::Friction);
    assert!(matches!(
        wf.confirm_long_term("UP"),
        Outcome::Skipped(SkipReason::WrongApprovalStep { .. })
    ));

    wf.acknowledge_risk();
    assert_eq!(wf.current_page(), PageId::ApproveLongTerm);
    assert!(wf.confirm_long_term("DOWN").is_applied());
    assert!(wf.confirm_budget().facts()[0].is(FactKind::DecisionApproved));
}

/// Exceptions below the threshold only count.
#[test]
fn test_below_threshold_does_not_jump() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.process_input(&event("EXCEPTION_RAISED", "job-1"));
    wf.process_input(&event("EXCEPTION_RAISED", "job-2"));
    assert_eq!(wf.friction().exceptions, 2);
    assert_eq!(wf.current_page(), PageId::Decision);

    wf.process_input(&event("EXCEPTION_RAISED", "job-3"));
    assert_eq!(wf.current_page(), PageId::Friction);
}

// =============================================================================
// Rules
// =============================================================================

/// Killing a rule records a 30-minute cooldown and jumps to kill review.
#[test]
fn test_kill_rule_sets_cooldown() {
    let (mut wf, clock) = setup(WorkflowConfig::default());
    let started = wf.start_rule("retry-cards");
    assert!(started.facts()[0].is(FactKind::RuleStarted));
    let rule_id = wf.rules().find_by_name("retry-cards").unwrap().id;

    let outcome = wf.kill_rule(rule_id);
    assert!(outcome.facts()[0].is(FactKind::RuleKilled));

    let rule = wf.rule(rule_id).unwrap();
    assert_eq!(rule.status, RuleStatus::Killed);
    let cooldown = rule.cooldown_until.unwrap();
    assert!(cooldown > clock.now());
    assert!(cooldown <= clock.now() + Duration::minutes(31));
    assert_eq!(wf.current_page(), PageId::KillReview);
}

/// A second kill of the same rule appends nothing.
#[test]
fn test_double_kill_appends_one_fact() {
    let (mut wf, _) = setup(WorkflowConfig::default());
    wf.start_rule("r");
    let rule_id = wf.rules().find_by_name("r").unwrap().id;

    wf.kill_rule(rule_id);
    let second = wf.kill_rule(rule_id);

    assert_eq!(second, Outcome::Skipped(SkipReason::RuleAlreadyKilled(rule_id)));
    assert_eq!(wf.ledger().count_of("RULE_KILLED"), 1);
}

/// The settle return fires once and only from kill review.
#[test]
fn test_settle_return_is_idempotent() {
    let (mut wf, clock) = setup(WorkflowConfig::default());
    wf.start_rule("r");
    let rule_id = wf.rules().find_by_name("r").unwrap().id;
    wf.kill_rule(rule_id);
    let token = wf.pending_return().unwrap().token;

    clock.advance(Duration::seconds(2));
    assert!(wf.settle_kill_return(token).is_applied());
    assert_eq!(wf.current_page(), PageId::Decision);
    assert_eq!(
        wf.settle_kill_return(token),
        Outcome::Skipped(SkipReason::StaleSettleToken)
    );
}

// =============================================================================
// TTL Expiry
// =============================================================================

/// A deferred decision past its new deadline expires on the next sweep.
#[test]
fn test_deferred_decision_expires() {
    let (mut wf, clock) = setup(WorkflowConfig::default());
    let id = wf
        .process_input(&event("PAYMENT_FAILED", "acct-9"))
        .queued()
        .unwrap();

    clock.advance(Duration::hours(20));
    wf.defer();
    let deadline = wf.queue().get(id).unwrap().deadline;
    assert_eq!(deadline, clock.now() + Duration::hours(24));

    clock.advance(Duration::hours(23));
    assert!(wf.sweep().is_empty());

    clock.advance(Duration::hours(2));
    let facts = wf.sweep();
    assert_eq!(facts.len(), 1);
    assert!(facts[0].is(FactKind::TtlExpired));
    assert_eq!(
        facts[0].value.get("deadline").cloned(),
        Some(json!(deadline))
    );
    assert!(wf.queue().is_empty());
    assert_eq!(wf.current_page(), PageId::KillReview);
}

/// A decision approved before its deadline is never expired later.
#[test]
fn test_approved_decision_never_expires() {
    let mut config = WorkflowConfig::default();
    config.ttl_hours = 1;
    let (mut wf, clock) = setup(config);
    wf.process_input(&event("PAYMENT_FAILED", "acct-1"));
    run_ritual(&mut wf);

    clock.advance(Duration::hours(5));
    assert!(wf.sweep().is_empty());
    assert_eq!(wf.ledger().count_of("TTL_EXPIRED"), 0);
}

/// Multiple expired cards leave in queue order.
#[test]
fn test_sweep_expires_in_queue_order() {
    let (mut wf, clock) = setup(WorkflowConfig::default());
    let a = wf.process_input(&event("PAYMENT_FAILED", "a")).queued().unwrap();
    let b = wf.process_input(&event("PAYMENT_FAILED", "b")).queued().unwrap();

    clock.advance(Duration::hours(30));
    let facts = wf.sweep();
    let ids: Vec<_> = facts
        .iter()
        .map(|f| f.value_str("decision_id").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![a.to_string(), b.to_string()]);
}
