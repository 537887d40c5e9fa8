//! Async workflow service
//!
//! Wraps a `DecisionWorkflow` in a mutex and runs its timers:
//! - TTL sweeper on a fixed interval
//! - Kill settle timer, aborted when superseded
//! - JSONL fact exporter, when an export path is configured
//! - Enrichment, on a blocking task per queued decision
//!
//! Every lifecycle call takes the mutex for the duration of one core call
//! and never awaits I/O while holding it.

mod errors;
mod settle;

pub use errors::{ServiceError, ServiceResult};

use std::sync::{Arc, Mutex as StdMutex};

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use self::settle::SettleTimer;
use crate::clock::SharedClock;
use crate::config::WorkflowConfig;
use crate::ledger::{export_jsonl, ExportResult, Reconciliation};
use crate::navigation::PageId;
use crate::observability::{log_event, log_event_with_fields, warn_event, Event};
use crate::workflow::{
    DecisionWorkflow, Enricher, InputOutcome, Outcome, SkipReason, WorkflowSnapshot,
};

/// What shutdown leaves behind.
#[derive(Debug)]
pub struct ShutdownReport {
    pub snapshot: WorkflowSnapshot,
    /// Facts written by the exporter, if one ran.
    pub facts_exported: Option<u64>,
}

/// Running service.
pub struct WorkflowService {
    workflow: Arc<Mutex<DecisionWorkflow>>,
    settle: Arc<SettleTimer>,
    enricher: Option<Arc<dyn Enricher>>,
    enrichments: StdMutex<Vec<JoinHandle<()>>>,
    sweeper: JoinHandle<()>,
    exporter: Option<JoinHandle<ExportResult<u64>>>,
}

impl WorkflowService {
    /// Boot the workflow and spawn its background tasks. Must be called
    /// inside a tokio runtime.
    pub fn start(
        config: WorkflowConfig,
        clock: SharedClock,
        enricher: Option<Arc<dyn Enricher>>,
    ) -> Self {
        log_event(Event::ServiceStart);

        let export_path = config.export_path.clone();
        let sweep_interval = config.sweep_interval();
        let settle_delay = config.kill_settle();

        let workflow = DecisionWorkflow::new(config, clock);

        let exporter = export_path.map(|path| {
            let rx = workflow.ledger().subscribe();
            tokio::spawn(async move {
                let result = export_jsonl(rx, &path).await;
                if let Err(e) = &result {
                    let msg = e.to_string();
                    log_event_with_fields(
                        Event::ExportFailed,
                        &[("code", e.code()), ("error", msg.as_str())],
                    );
                }
                result
            })
        });

        let workflow = Arc::new(Mutex::new(workflow));
        let settle = Arc::new(SettleTimer::new(Arc::clone(&workflow), settle_delay));

        let sweeper = {
            let workflow = Arc::clone(&workflow);
            let settle = Arc::clone(&settle);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(sweep_interval);
                // First tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let pending = {
                        let mut wf = workflow.lock().await;
                        wf.sweep();
                        wf.pending_return()
                    };
                    settle.sync(pending);
                }
            })
        };

        log_event(Event::ServiceReady);

        Self {
            workflow,
            settle,
            enricher,
            enrichments: StdMutex::new(Vec::new()),
            sweeper,
            exporter,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub async fn approve(&self) -> Outcome {
        self.run("approve", |wf| wf.approve()).await
    }

    pub async fn confirm_long_term(&self, direction: &str) -> Outcome {
        self.run("confirm_long_term", |wf| wf.confirm_long_term(direction))
            .await
    }

    pub async fn confirm_budget(&self) -> Outcome {
        self.run("confirm_budget", |wf| wf.confirm_budget()).await
    }

    pub async fn deny(&self) -> Outcome {
        self.run("deny", |wf| wf.deny()).await
    }

    pub async fn defer(&self) -> Outcome {
        self.run("defer", |wf| wf.defer()).await
    }

    pub async fn start_rule(&self, name: &str) -> Outcome {
        self.run("start_rule", |wf| wf.start_rule(name)).await
    }

    pub async fn kill_rule(&self, rule_id: Uuid) -> Outcome {
        self.run("kill_rule", |wf| wf.kill_rule(rule_id)).await
    }

    pub async fn acknowledge_risk(&self) -> Outcome {
        self.run("acknowledge_risk", |wf| wf.acknowledge_risk()).await
    }

    /// Manual navigation. A refused jump is logged at WARN.
    pub async fn go_to_page(&self, page: PageId) -> Outcome {
        let (outcome, from) = {
            let mut wf = self.workflow.lock().await;
            let from = wf.current_page();
            let outcome = wf.go_to_page(page);
            self.settle.sync(wf.pending_return());
            (outcome, from)
        };

        if let Outcome::Skipped(SkipReason::PageNotReachable(_)) = outcome {
            warn_event(
                Event::NavigationRejected,
                &[("from", from.code()), ("page", page.code())],
            );
        }
        outcome
    }

    /// Validate and record raw input; enrich any decision it opens.
    pub async fn process_input(&self, raw: &Value) -> InputOutcome {
        let (outcome, card) = {
            let mut wf = self.workflow.lock().await;
            let outcome = wf.process_input(raw);
            self.settle.sync(wf.pending_return());
            let card = outcome
                .queued()
                .and_then(|id| wf.queue().get(id).cloned());
            (outcome, card)
        };

        if let (Some(enricher), Some(card)) = (self.enricher.clone(), card) {
            let workflow = Arc::clone(&self.workflow);
            let handle = tokio::spawn(async move {
                let decision_id = card.id;
                let classified = tokio::task::spawn_blocking(move || enricher.classify(&card)).await;
                match classified {
                    Ok(Some(enrichment)) => {
                        workflow
                            .lock()
                            .await
                            .apply_enrichment(decision_id, enrichment);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let id = decision_id.to_string();
                        let msg = e.to_string();
                        log_event_with_fields(
                            Event::EnrichmentFailed,
                            &[("decision_id", id.as_str()), ("error", msg.as_str())],
                        );
                    }
                }
            });
            let mut pending = self.enrichments.lock().unwrap_or_else(|e| e.into_inner());
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }

        outcome
    }

    /// Wait for every enrichment spawned so far.
    pub async fn flush_enrichments(&self) {
        let handles: Vec<_> = self
            .enrichments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                let msg = e.to_string();
                log_event_with_fields(Event::EnrichmentFailed, &[("error", msg.as_str())]);
            }
        }
    }

    #[cfg(test)]
    fn pending_enrichments(&self) -> usize {
        self.enrichments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Sweep now instead of waiting for the next tick.
    pub async fn sweep_now(&self) -> usize {
        let (expired, pending) = {
            let mut wf = self.workflow.lock().await;
            let expired = wf.sweep().len();
            (expired, wf.pending_return())
        };
        self.settle.sync(pending);
        expired
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Run `f` against the workflow under the lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&DecisionWorkflow) -> R) -> R {
        let wf = self.workflow.lock().await;
        f(&wf)
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        self.workflow.lock().await.snapshot()
    }

    pub async fn reconcile(&self) -> Reconciliation {
        self.workflow.lock().await.reconcile()
    }

    /// Stop background tasks, drain the exporter and take a final snapshot.
    pub async fn shutdown(self) -> ServiceResult<ShutdownReport> {
        self.sweeper.abort();
        self.settle.cancel();
        self.flush_enrichments().await;

        let snapshot = {
            let wf = self.workflow.lock().await;
            wf.ledger().close_subscribers();
            wf.snapshot()
        };

        let facts_exported = match self.exporter {
            Some(handle) => Some(handle.await??),
            None => None,
        };

        log_event(Event::ServiceStop);
        Ok(ShutdownReport {
            snapshot,
            facts_exported,
        })
    }

    async fn run(&self, action: &str, f: impl FnOnce(&mut DecisionWorkflow) -> Outcome) -> Outcome {
        let outcome = {
            let mut wf = self.workflow.lock().await;
            let outcome = f(&mut wf);
            self.settle.sync(wf.pending_return());
            outcome
        };

        if let Outcome::Skipped(reason) = &outcome {
            let reason = reason.to_string();
            warn_event(
                Event::ActionSkipped,
                &[("action", action), ("reason", reason.as_str())],
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::workflow::{DecisionCard, Enricher, Enrichment, RiskLabelEnricher};
    use serde_json::json;
    use std::time::Duration;

    struct PanickingEnricher;

    impl Enricher for PanickingEnricher {
        fn classify(&self, _card: &DecisionCard) -> Option<Enrichment> {
            panic!("classifier unavailable");
        }
    }

    fn payment_failed(subject: &str) -> Value {
        json!({
            "event_type": "PAYMENT_FAILED",
            "subject_id": subject,
            "value": {},
            "source": "billing"
        })
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            kill_settle_ms: 20,
            sweep_interval_ms: 10,
            ..WorkflowConfig::default()
        }
    }

    #[tokio::test]
    async fn test_settle_returns_to_entry() {
        let service = WorkflowService::start(config(), Arc::new(ManualClock::starting_now()), None);
        let rule_id = service.start_rule("r").await.facts()[0].subject_id.parse().unwrap();
        service.kill_rule(rule_id).await;
        assert_eq!(service.settle.armed_token(), Some(1));
        assert_eq!(
            service.inspect(|wf| wf.current_page()).await,
            PageId::KillReview
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.inspect(|wf| wf.current_page()).await, PageId::ENTRY);
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_navigation_aborts_settle_task() {
        let mut cfg = config();
        cfg.kill_settle_ms = 50;
        let service = WorkflowService::start(cfg, Arc::new(ManualClock::starting_now()), None);
        let rule_id = service.start_rule("r").await.facts()[0].subject_id.parse().unwrap();
        service.kill_rule(rule_id).await;
        service.go_to_page(PageId::Budget).await;
        assert_eq!(service.settle.armed_token(), None);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(service.inspect(|wf| wf.current_page()).await, PageId::Budget);
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_enrichment_attached() {
        let service = WorkflowService::start(
            config(),
            Arc::new(ManualClock::starting_now()),
            Some(Arc::new(RiskLabelEnricher)),
        );
        let outcome = service
            .process_input(&json!({
                "event_type": "PAYMENT_FAILED",
                "subject_id": "acct-1",
                "value": {},
                "source": "billing"
            }))
            .await;
        let id = outcome.queued().unwrap();
        service.flush_enrichments().await;

        let label = service
            .inspect(|wf| wf.queue().get(id).and_then(|c| c.enrichment.clone()))
            .await
            .map(|e| e.label);
        assert_eq!(label.as_deref(), Some("elevated"));
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_enrichment_leaves_card_untouched() {
        let service = WorkflowService::start(
            config(),
            Arc::new(ManualClock::starting_now()),
            Some(Arc::new(PanickingEnricher)),
        );
        let id = service
            .process_input(&payment_failed("acct-1"))
            .await
            .queued()
            .unwrap();
        service.flush_enrichments().await;

        let (enriched, facts) = service
            .inspect(|wf| {
                (
                    wf.queue().get(id).map(|c| c.enrichment.is_some()),
                    wf.ledger().count_of("DECISION_ENRICHED"),
                )
            })
            .await;
        assert_eq!(enriched, Some(false));
        assert_eq!(facts, 0);
        assert!(service.approve().await.is_applied());
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_finished_enrichments_are_pruned() {
        let service = WorkflowService::start(
            config(),
            Arc::new(ManualClock::starting_now()),
            Some(Arc::new(RiskLabelEnricher)),
        );
        service.process_input(&payment_failed("acct-1")).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        for subject in ["acct-2", "acct-3", "acct-4"] {
            service.process_input(&payment_failed(subject)).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(service.pending_enrichments(), 1);

        service.flush_enrichments().await;
        assert_eq!(service.pending_enrichments(), 0);
        service.shutdown().await.unwrap();
    }
}
