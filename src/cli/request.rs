//! Stdin command protocol for `run`
//!
//! One JSON object per line, tagged by `op`:
//! `{"op":"approve"}`, `{"op":"confirm_long_term","direction":"UP"}`,
//! `{"op":"input","raw":{...}}`, `{"op":"goto","page":"P2"}`, ...

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::{CliError, CliResult};
use crate::navigation::PageId;
use crate::service::WorkflowService;
use crate::workflow::{InputOutcome, Outcome};

/// A lifecycle command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Approve,
    ConfirmLongTerm { direction: String },
    ConfirmBudget,
    Deny,
    Defer,
    StartRule { name: String },
    KillRule {
        #[serde(default)]
        rule_id: Option<Uuid>,
        #[serde(default)]
        name: Option<String>,
    },
    Goto { page: String },
    AcknowledgeRisk,
    Input { raw: Value },
    Sweep,
    State,
    Reconcile,
}

impl Request {
    pub fn parse(value: Value) -> CliResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| CliError::bad_request(format!("Invalid command: {}", e)))
    }
}

/// Execute one command and build the response payload.
pub async fn dispatch(service: &WorkflowService, request: Request) -> CliResult<Value> {
    let data = match request {
        Request::Approve => outcome_json(&service.approve().await),
        Request::ConfirmLongTerm { direction } => {
            outcome_json(&service.confirm_long_term(&direction).await)
        }
        Request::ConfirmBudget => outcome_json(&service.confirm_budget().await),
        Request::Deny => outcome_json(&service.deny().await),
        Request::Defer => outcome_json(&service.defer().await),
        Request::StartRule { name } => outcome_json(&service.start_rule(&name).await),
        Request::KillRule { rule_id, name } => {
            let rule_id = match (rule_id, name) {
                (Some(id), _) => id,
                (None, Some(name)) => service
                    .inspect(|wf| wf.rules().find_by_name(&name).map(|r| r.id))
                    .await
                    .ok_or_else(|| CliError::bad_request(format!("Unknown rule: {}", name)))?,
                (None, None) => {
                    return Err(CliError::bad_request("kill_rule needs rule_id or name"))
                }
            };
            outcome_json(&service.kill_rule(rule_id).await)
        }
        Request::Goto { page } => {
            let page = PageId::from_code(&page)
                .ok_or_else(|| CliError::bad_request(format!("Unknown page: {}", page)))?;
            outcome_json(&service.go_to_page(page).await)
        }
        Request::AcknowledgeRisk => outcome_json(&service.acknowledge_risk().await),
        Request::Input { raw } => input_json(&service.process_input(&raw).await),
        Request::Sweep => json!({"expired": service.sweep_now().await}),
        Request::State => {
            service
                .inspect(|wf| {
                    json!({
                        "navigation": wf.navigation(),
                        "queue": wf.queue(),
                        "rules": wf.rules(),
                        "budget": wf.budget(),
                        "friction": wf.friction(),
                        "facts": wf.ledger().len(),
                    })
                })
                .await
        }
        Request::Reconcile => {
            let r = service.reconcile().await;
            json!({"consistent": r.is_consistent(), "reconciliation": r})
        }
    };
    Ok(data)
}

fn outcome_json(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Applied(facts) => json!({"applied": true, "facts": facts}),
        Outcome::Skipped(reason) => json!({
            "applied": false,
            "skipped": reason.code(),
            "detail": reason.to_string(),
        }),
    }
}

fn input_json(outcome: &InputOutcome) -> Value {
    match outcome {
        InputOutcome::Accepted { fact, queued } => json!({
            "accepted": true,
            "fact": fact,
            "queued": queued,
        }),
        InputOutcome::Ignored { reason, fact } => json!({
            "accepted": false,
            "reason": reason.code(),
            "fact": fact,
        }),
    }
}
