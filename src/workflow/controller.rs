//! Decision Workflow
//!
//! Owns the decision queue, rule registry, budget gate and friction
//! monitor, and drives the navigation state machine.
//!
//! - Every state-changing lifecycle action appends exactly one fact
//!   (a budget denial appends `BUDGET_EXCEEDED` then `DECISION_DENIED`)
//! - Navigation-only actions append nothing
//! - Every appended fact passes through the friction monitor
//! - A failed precondition changes nothing and is reported as `Skipped`
//!
//! Non-Responsibilities:
//! - Does not sleep or spawn; timers are tokens polled by the caller
//! - Does not perform I/O beyond the in-memory ledger
//! - Does not retry

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::decision::{DecisionCard, DecisionQueue, Direction};
use super::enrichment::Enrichment;
use super::input::{parse_input, validate_input, Rejection, ValidatedInput};
use super::outcome::{InputOutcome, Outcome, SkipReason};
use super::rule::{Rule, RuleRegistry};
use super::snapshot::WorkflowSnapshot;
use crate::budget::{BudgetDecision, BudgetGate, WeeklyBudget};
use crate::clock::SharedClock;
use crate::config::WorkflowConfig;
use crate::friction::{FrictionDelta, FrictionMonitor, FrictionPolicy, FrictionSignal};
use crate::ledger::{Fact, FactKind, FactLedger, FactSource, LedgerProjection, Reconciliation};
use crate::navigation::{NavAction, NavigationState, PageId};
use crate::observability::{log_event_with_fields, warn_event, Event};
use crate::ttl::TtlScheduler;

/// Armed return from the kill-review page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReturn {
    pub token: u64,
    pub due_at: DateTime<Utc>,
}

/// The orchestrator.
pub struct DecisionWorkflow {
    config: WorkflowConfig,
    clock: SharedClock,
    ledger: Arc<FactLedger>,
    nav: NavigationState,
    queue: DecisionQueue,
    rules: RuleRegistry,
    budget: BudgetGate,
    friction: FrictionMonitor,
    ttl: TtlScheduler,
    staged_direction: Option<Direction>,
    pending_return: Option<PendingReturn>,
    next_token: u64,
    friction_window_from: u64,
}

impl DecisionWorkflow {
    /// Workflow using the configured threshold policy.
    pub fn new(config: WorkflowConfig, clock: SharedClock) -> Self {
        let policy = Box::new(config.friction);
        Self::with_policy(config, clock, policy)
    }

    /// Workflow with an injected friction policy.
    pub fn with_policy(
        config: WorkflowConfig,
        clock: SharedClock,
        policy: Box<dyn FrictionPolicy>,
    ) -> Self {
        let now = clock.now();
        Self {
            ledger: Arc::new(FactLedger::new(Arc::clone(&clock))),
            nav: NavigationState::new(),
            queue: DecisionQueue::new(),
            rules: RuleRegistry::new(),
            budget: BudgetGate::new(config.high_decisions_cap, now),
            friction: FrictionMonitor::new(config.routing(), policy),
            ttl: TtlScheduler::new(config.sweep_interval()),
            staged_direction: None,
            pending_return: None,
            next_token: 0,
            friction_window_from: 0,
            config,
            clock,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn navigation(&self) -> NavigationState {
        self.nav
    }

    pub fn current_page(&self) -> PageId {
        self.nav.current_page
    }

    pub fn queue(&self) -> &DecisionQueue {
        &self.queue
    }

    /// Head of the queue.
    pub fn current_decision(&self) -> Option<&DecisionCard> {
        self.queue.current()
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rule(&self, id: Uuid) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn budget(&self) -> WeeklyBudget {
        self.budget.snapshot()
    }

    pub fn friction(&self) -> FrictionDelta {
        self.friction.delta()
    }

    pub fn ledger(&self) -> &Arc<FactLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn ttl(&self) -> &TtlScheduler {
        &self.ttl
    }

    pub fn staged_direction(&self) -> Option<Direction> {
        self.staged_direction
    }

    /// Armed kill-review return, if any.
    pub fn pending_return(&self) -> Option<PendingReturn> {
        self.pending_return
    }

    // =========================================================================
    // APPROVAL RITUAL
    // =========================================================================

    /// Enter the approval ritual for the current decision.
    pub fn approve(&mut self) -> Outcome {
        let Some(card) = self.queue.current() else {
            return Outcome::Skipped(SkipReason::NoCurrentDecision);
        };
        if self.nav.current_page != PageId::ENTRY {
            return Outcome::Skipped(SkipReason::NotOnEntryPage {
                current: self.nav.current_page,
            });
        }

        let decision_id = card.id;
        self.staged_direction = None;
        self.drive(NavAction::ApproveStart { decision_id });

        let id = decision_id.to_string();
        log_event_with_fields(Event::ApprovalStarted, &[("decision_id", id.as_str())]);
        Outcome::Applied(Vec::new())
    }

    /// Stage the long-term direction and move to the budget step.
    pub fn confirm_long_term(&mut self, direction: &str) -> Outcome {
        if !self.nav.approve_flow.active {
            return Outcome::Skipped(SkipReason::NoActiveApproval);
        }
        if self.nav.current_page != PageId::ApproveLongTerm {
            return Outcome::Skipped(SkipReason::WrongApprovalStep {
                current: self.nav.current_page,
            });
        }
        let Some(direction) = Direction::parse(direction) else {
            return Outcome::Skipped(SkipReason::InvalidDirection(direction.to_string()));
        };

        self.staged_direction = Some(direction);
        self.drive(NavAction::ApproveLongTermDone);
        Outcome::Applied(Vec::new())
    }

    /// Consult the budget gate and finish the ritual.
    ///
    /// Allowed appends `DECISION_APPROVED`. Denied appends `BUDGET_EXCEEDED`
    /// then `DECISION_DENIED`. Either way the card leaves the queue and
    /// navigation returns to the entry page.
    pub fn confirm_budget(&mut self) -> Outcome {
        let flow = self.nav.approve_flow;
        if !flow.active {
            return Outcome::Skipped(SkipReason::NoActiveApproval);
        }
        if self.nav.current_page != PageId::ApproveBudget || !flow.long_term_done {
            return Outcome::Skipped(SkipReason::WrongApprovalStep {
                current: self.nav.current_page,
            });
        }
        let Some(decision_id) = flow.decision_id else {
            return Outcome::Skipped(SkipReason::NoActiveApproval);
        };
        let Some(card) = self.queue.remove(decision_id) else {
            return Outcome::Skipped(SkipReason::UnknownDecision(decision_id));
        };

        let direction = self.staged_direction.take();
        let verdict = self.budget.try_consume(card.decision_cost);

        // Ritual ends first so a spike raised by these facts returns to entry
        self.drive(NavAction::ApproveBudgetDone);

        let id = card.id.to_string();
        let facts = match verdict {
            BudgetDecision::Allowed => {
                let fact = self.record(
                    FactKind::DecisionApproved.as_str(),
                    &card.subject_id,
                    json!({
                        "decision_id": card.id,
                        "action_type": card.action_type,
                        "cost": card.decision_cost,
                        "direction": direction,
                    }),
                    FactSource::Workflow.as_str(),
                );
                log_event_with_fields(
                    Event::DecisionApproved,
                    &[("decision_id", id.as_str()), ("cost", card.decision_cost.as_str())],
                );
                vec![fact]
            }
            BudgetDecision::Denied { used, cap } => {
                let exceeded = self.record(
                    FactKind::BudgetExceeded.as_str(),
                    &card.subject_id,
                    json!({
                        "decision_id": card.id,
                        "cost": card.decision_cost,
                        "used": used,
                        "cap": cap,
                    }),
                    FactSource::BudgetGate.as_str(),
                );
                let denied = self.record(
                    FactKind::DecisionDenied.as_str(),
                    &card.subject_id,
                    json!({
                        "decision_id": card.id,
                        "action_type": card.action_type,
                        "cost": card.decision_cost,
                        "reason": "budget_exceeded",
                    }),
                    FactSource::BudgetGate.as_str(),
                );
                let used = used.to_string();
                let cap = cap.to_string();
                warn_event(
                    Event::BudgetExceeded,
                    &[
                        ("cap", cap.as_str()),
                        ("decision_id", id.as_str()),
                        ("used", used.as_str()),
                    ],
                );
                vec![exceeded, denied]
            }
        };

        Outcome::Applied(facts)
    }

    // =========================================================================
    // DENY / DEFER
    // =========================================================================

    /// Deny the current decision. No navigation.
    pub fn deny(&mut self) -> Outcome {
        if self.nav.approve_flow.active {
            return Outcome::Skipped(SkipReason::ApprovalInProgress);
        }
        let Some(decision_id) = self.queue.current().map(|c| c.id) else {
            return Outcome::Skipped(SkipReason::NoCurrentDecision);
        };
        let Some(card) = self.queue.remove(decision_id) else {
            return Outcome::Skipped(SkipReason::UnknownDecision(decision_id));
        };

        let fact = self.record(
            FactKind::DecisionDenied.as_str(),
            &card.subject_id,
            json!({
                "decision_id": card.id,
                "action_type": card.action_type,
                "cost": card.decision_cost,
                "reason": "manual",
            }),
            FactSource::Workflow.as_str(),
        );

        let id = card.id.to_string();
        log_event_with_fields(Event::DecisionDenied, &[("decision_id", id.as_str())]);
        Outcome::Applied(vec![fact])
    }

    /// Push the current decision's deadline out by the TTL and move it to
    /// the tail of the queue.
    pub fn defer(&mut self) -> Outcome {
        if self.nav.approve_flow.active {
            return Outcome::Skipped(SkipReason::ApprovalInProgress);
        }
        let Some(decision_id) = self.queue.current().map(|c| c.id) else {
            return Outcome::Skipped(SkipReason::NoCurrentDecision);
        };
        let Some(mut card) = self.queue.remove(decision_id) else {
            return Outcome::Skipped(SkipReason::UnknownDecision(decision_id));
        };

        let previous_deadline = card.deadline;
        card.deadline = offset(self.clock.now(), self.config.ttl());

        let fact = self.record(
            FactKind::DecisionDeferred.as_str(),
            &card.subject_id,
            json!({
                "decision_id": card.id,
                "previous_deadline": previous_deadline,
                "deadline": card.deadline,
            }),
            FactSource::Workflow.as_str(),
        );

        let id = card.id.to_string();
        let deadline = card.deadline.to_rfc3339();
        log_event_with_fields(
            Event::DecisionDeferred,
            &[("deadline", deadline.as_str()), ("decision_id", id.as_str())],
        );

        self.queue.push_back(card);
        Outcome::Applied(vec![fact])
    }

    // =========================================================================
    // RULES
    // =========================================================================

    /// Start a new rule.
    pub fn start_rule(&mut self, name: &str) -> Outcome {
        let name = name.trim();
        if name.is_empty() {
            return Outcome::Skipped(SkipReason::EmptyRuleName);
        }

        let rule = Rule::start(name, self.clock.now());
        let rule_id = rule.id.to_string();
        let fact = self.record(
            FactKind::RuleStarted.as_str(),
            &rule_id,
            json!({"rule_id": rule.id, "name": rule.name}),
            FactSource::Workflow.as_str(),
        );
        self.rules.insert(rule);

        log_event_with_fields(
            Event::RuleStarted,
            &[("name", name), ("rule_id", rule_id.as_str())],
        );
        Outcome::Applied(vec![fact])
    }

    /// Kill a running rule and jump to kill review.
    ///
    /// Arms a return to the entry page after the settle delay. Killing an
    /// already killed rule is a no-op.
    pub fn kill_rule(&mut self, rule_id: Uuid) -> Outcome {
        let Some(rule) = self.rules.get(rule_id).cloned() else {
            return Outcome::Skipped(SkipReason::UnknownRule(rule_id));
        };

        let now = self.clock.now();
        let cooldown_until = offset(now, self.config.kill_cooldown());
        let Some(killed) = rule.kill(now, cooldown_until) else {
            return Outcome::Skipped(SkipReason::RuleAlreadyKilled(rule_id));
        };

        let id = rule_id.to_string();
        let fact = self.record(
            FactKind::RuleKilled.as_str(),
            &id,
            json!({
                "rule_id": killed.id,
                "name": killed.name,
                "cooldown_until": cooldown_until,
            }),
            FactSource::Workflow.as_str(),
        );
        self.rules.replace(killed);

        self.drive(NavAction::Kill);
        self.next_token += 1;
        self.pending_return = Some(PendingReturn {
            token: self.next_token,
            due_at: offset(now, self.config.kill_settle_offset()),
        });

        let until = cooldown_until.to_rfc3339();
        log_event_with_fields(
            Event::RuleKilled,
            &[("cooldown_until", until.as_str()), ("rule_id", id.as_str())],
        );
        Outcome::Applied(vec![fact])
    }

    /// Return from kill review if `token` is still the armed one.
    pub fn settle_kill_return(&mut self, token: u64) -> Outcome {
        match self.pending_return {
            Some(pending) if pending.token == token => {
                self.pending_return = None;
                if self.nav.current_page != PageId::KillReview {
                    return Outcome::Skipped(SkipReason::StaleSettleToken);
                }
                self.drive(NavAction::GoTo {
                    page: PageId::ENTRY,
                    force: true,
                });
                let token = token.to_string();
                log_event_with_fields(Event::KillSettled, &[("token", token.as_str())]);
                Outcome::Applied(Vec::new())
            }
            _ => Outcome::Skipped(SkipReason::StaleSettleToken),
        }
    }

    /// Fire the armed return if it is due at `now`.
    pub fn poll_timers(&mut self, now: DateTime<Utc>) -> Option<Outcome> {
        let pending = self.pending_return?;
        if pending.due_at > now {
            return None;
        }
        Some(self.settle_kill_return(pending.token))
    }

    // =========================================================================
    // NAVIGATION & ESCALATION
    // =========================================================================

    /// Manual page change.
    pub fn go_to_page(&mut self, page: PageId) -> Outcome {
        let action = NavAction::GoTo { page, force: false };
        if !self.nav.admits(&action) {
            return Outcome::Skipped(SkipReason::PageNotReachable(page));
        }
        self.drive(action);
        Outcome::Applied(Vec::new())
    }

    /// Acknowledge an escalation and return to where it interrupted.
    pub fn acknowledge_risk(&mut self) -> Outcome {
        if !self.nav.risk_jump.active {
            return Outcome::Skipped(SkipReason::NoActiveRisk);
        }

        let return_to = self.nav.risk_return_target();
        let delta = self.friction.delta();
        let fact = self.record(
            FactKind::RiskCleared.as_str(),
            "friction",
            json!({"return_to": return_to, "delta": delta}),
            FactSource::Workflow.as_str(),
        );
        self.drive(NavAction::RiskCleared);

        log_event_with_fields(Event::RiskCleared, &[("return_to", return_to.code())]);
        Outcome::Applied(vec![fact])
    }

    /// Start a new friction counting window.
    pub fn reset_friction_window(&mut self) {
        self.friction_window_from = self.ledger.last().map(|f| f.seq).unwrap_or(0);
        self.friction.reset_window();
    }

    /// Start a new budget week at `week_start`.
    pub fn reset_budget_window(&mut self, week_start: DateTime<Utc>) {
        self.budget.reset(week_start, offset(week_start, Duration::days(7)));
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Validate and record raw input. Never fails.
    pub fn process_input(&mut self, raw: &Value) -> InputOutcome {
        match validate_input(raw, &self.config.input_schema) {
            Ok(input) => self.accept(input),
            Err(rejection) => self.ignore(rejection),
        }
    }

    /// `process_input` over unparsed text.
    pub fn process_input_str(&mut self, raw: &str) -> InputOutcome {
        match parse_input(raw, &self.config.input_schema) {
            Ok(input) => self.accept(input),
            Err(rejection) => self.ignore(rejection),
        }
    }

    fn accept(&mut self, input: ValidatedInput) -> InputOutcome {
        let fact = self.record(
            &input.event_type,
            &input.subject_id,
            input.value.clone(),
            &input.source,
        );
        let queued = self.route_decision(&input);
        InputOutcome::Accepted { fact, queued }
    }

    fn ignore(&mut self, rejection: Rejection) -> InputOutcome {
        let subject = rejection
            .subject_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let fact = self.record(
            FactKind::InputIgnored.as_str(),
            &subject,
            json!({
                "reason": rejection.reason.code(),
                "detail": rejection.detail,
                "schema_version": self.config.input_schema.version,
            }),
            FactSource::InputValidator.as_str(),
        );

        warn_event(
            Event::InputIgnored,
            &[
                ("detail", rejection.detail.as_str()),
                ("reason", rejection.reason.code()),
            ],
        );
        InputOutcome::Ignored {
            reason: rejection.reason,
            fact,
        }
    }

    /// Open a decision if the event type has a trigger.
    fn route_decision(&mut self, input: &ValidatedInput) -> Option<Uuid> {
        let template = self.config.decision_triggers.get(&input.event_type)?.clone();

        if self.queue.has_pending(&input.subject_id, &template.action_type) {
            return None;
        }

        let now = self.clock.now();
        let card = DecisionCard {
            id: Uuid::new_v4(),
            subject_id: input.subject_id.clone(),
            subject_type: template.subject_type.clone(),
            action_type: template.action_type.clone(),
            decision_cost: template.cost,
            reversibility: template.reversibility,
            blast_radius: template.blast_radius,
            deadline: offset(now, self.config.ttl()),
            created_at: now,
            summary: template.render_summary(&input.event_type, &input.subject_id),
            enrichment: None,
        };
        let id = card.id;

        let decision_id = id.to_string();
        log_event_with_fields(
            Event::DecisionQueued,
            &[
                ("action_type", card.action_type.as_str()),
                ("cost", card.decision_cost.as_str()),
                ("decision_id", decision_id.as_str()),
                ("subject_id", card.subject_id.as_str()),
            ],
        );

        self.queue.push_back(card);
        Some(id)
    }

    /// Attach classifier output to a queued decision.
    pub fn apply_enrichment(&mut self, decision_id: Uuid, enrichment: Enrichment) -> Outcome {
        let Some(card) = self.queue.get_mut(decision_id) else {
            return Outcome::Skipped(SkipReason::UnknownDecision(decision_id));
        };
        card.enrichment = Some(enrichment.clone());
        let subject = card.subject_id.clone();

        let fact = self.record(
            FactKind::DecisionEnriched.as_str(),
            &subject,
            json!({
                "decision_id": decision_id,
                "label": enrichment.label,
                "classifier": enrichment.classifier,
            }),
            FactSource::Enricher.as_str(),
        );

        let id = decision_id.to_string();
        log_event_with_fields(
            Event::DecisionEnriched,
            &[("decision_id", id.as_str()), ("label", enrichment.label.as_str())],
        );
        Outcome::Applied(vec![fact])
    }

    // =========================================================================
    // TTL
    // =========================================================================

    /// Expire every card whose deadline is strictly before `now`.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Fact> {
        let expired = self.ttl.collect_expired(&mut self.queue, now);
        let mut facts = Vec::with_capacity(expired.len());

        for card in expired {
            if self.nav.approve_flow.decision_id == Some(card.id) {
                self.staged_direction = None;
            }

            let fact = self.record(
                FactKind::TtlExpired.as_str(),
                &card.subject_id,
                json!({
                    "decision_id": card.id,
                    "action_type": card.action_type,
                    "deadline": card.deadline,
                    "swept_at": now,
                }),
                FactSource::TtlScheduler.as_str(),
            );
            self.drive(NavAction::TtlExpired {
                decision_id: card.id,
            });

            let id = card.id.to_string();
            let deadline = card.deadline.to_rfc3339();
            log_event_with_fields(
                Event::TtlExpired,
                &[("deadline", deadline.as_str()), ("decision_id", id.as_str())],
            );
            facts.push(fact);
        }

        facts
    }

    /// Sweep at the clock's current time.
    pub fn sweep(&mut self) -> Vec<Fact> {
        let now = self.clock.now();
        self.sweep_expired(now)
    }

    // =========================================================================
    // PROJECTION & EXPORT
    // =========================================================================

    /// Compare live counters against a full ledger replay.
    pub fn reconcile(&self) -> Reconciliation {
        let window = self.budget.snapshot();
        let projection = self.ledger.read(|facts| {
            LedgerProjection::replay_from(
                facts,
                self.friction.routing(),
                &window,
                self.friction_window_from,
            )
        });
        let reconciliation = projection.reconcile(&self.friction.delta(), self.budget.used());

        for mismatch in &reconciliation.mismatches {
            let replayed = mismatch.replayed.to_string();
            let live = mismatch.live.to_string();
            log_event_with_fields(
                Event::ProjectionMismatch,
                &[
                    ("counter", mismatch.counter),
                    ("live", live.as_str()),
                    ("replayed", replayed.as_str()),
                ],
            );
        }

        reconciliation
    }

    /// Export facts and model state.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            taken_at: self.clock.now(),
            navigation: self.nav,
            queue: self.queue.iter().cloned().collect(),
            rules: self.rules.iter().cloned().collect(),
            budget: self.budget.snapshot(),
            friction: self.friction.delta(),
            friction_window_from: self.friction_window_from,
            facts: self.ledger.facts(),
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Append a fact and let the friction monitor see it.
    fn record(&mut self, event_type: &str, subject_id: &str, value: Value, source: &str) -> Fact {
        let fact = self.ledger.append(event_type, subject_id, value, source);

        if let FrictionSignal::Spike(category) = self.friction.observe(&fact, self.nav.current_page)
        {
            let from = self.nav.current_page;
            self.drive(NavAction::RiskSpike);
            log_event_with_fields(
                Event::RiskSpike,
                &[("category", category.as_str()), ("from", from.code())],
            );
        }

        fact
    }

    /// Apply a navigation action. Any admitted action other than `KILL`
    /// cancels an armed kill return.
    fn drive(&mut self, action: NavAction) -> bool {
        if !self.nav.admits(&action) {
            return false;
        }
        self.nav = self.nav.apply(&action);
        if action != NavAction::Kill {
            self.pending_return = None;
        }
        true
    }
}

/// `at + by`, saturating at the end of representable time.
fn offset(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl std::fmt::Debug for DecisionWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionWorkflow")
            .field("nav", &self.nav)
            .field("queue_len", &self.queue.len())
            .field("rules", &self.rules.len())
            .field("budget", &self.budget.snapshot())
            .field("friction", &self.friction.delta())
            .field("pending_return", &self.pending_return)
            .finish()
    }
}
