//! Workflow configuration
//!
//! A single JSON file. Every field has a default, so `{}` is a valid
//! config. Loading always validates.

mod errors;
mod schema;

pub use errors::{ConfigError, ConfigResult};
pub use schema::{DecisionTemplate, InputSchema, REQUIRED_FIELDS};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::budget::DecisionCost;
use crate::friction::{FrictionCategory, FrictionRouting, ThresholdPolicy};
use crate::ledger::FactKind;
use crate::observability::Severity;
use crate::workflow::{BlastRadius, Reversibility};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Lifetime of a queued or deferred decision.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Cooldown recorded on a killed rule.
    #[serde(default = "default_kill_cooldown_minutes")]
    pub kill_cooldown_minutes: u64,

    /// Delay before the kill-review page returns to entry.
    #[serde(default = "default_kill_settle_ms")]
    pub kill_settle_ms: u64,

    /// TTL sweep period.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// High-cost approvals allowed per week.
    #[serde(default = "default_high_decisions_cap")]
    pub high_decisions_cap: u32,

    #[serde(default)]
    pub friction: ThresholdPolicy,

    #[serde(default)]
    pub input_schema: InputSchema,

    /// Event type that opens a decision.
    #[serde(default = "default_decision_triggers")]
    pub decision_triggers: BTreeMap<String, DecisionTemplate>,

    /// Event type counted by the friction monitor.
    #[serde(default = "default_friction_categories")]
    pub friction_categories: BTreeMap<String, FrictionCategory>,

    /// Optional JSONL stream of every appended fact.
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Longest decision lifetime accepted: one year.
pub const MAX_TTL_HOURS: u64 = 24 * 365;
/// Longest rule cooldown accepted: one week.
pub const MAX_KILL_COOLDOWN_MINUTES: u64 = 7 * 24 * 60;
/// Longest kill settle delay accepted: ten minutes.
pub const MAX_KILL_SETTLE_MS: u64 = 10 * 60 * 1000;

fn default_ttl_hours() -> u64 {
    24
}
fn default_kill_cooldown_minutes() -> u64 {
    30
}
fn default_kill_settle_ms() -> u64 {
    1500
}
fn default_sweep_interval_ms() -> u64 {
    60_000
}
fn default_high_decisions_cap() -> u32 {
    3
}
fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_decision_triggers() -> BTreeMap<String, DecisionTemplate> {
    BTreeMap::from([(
        "PAYMENT_FAILED".to_string(),
        DecisionTemplate {
            subject_type: "account".to_string(),
            action_type: "RETRY_PAYMENT".to_string(),
            cost: DecisionCost::High,
            reversibility: Reversibility::PartiallyReversible,
            blast_radius: BlastRadius::Local,
            summary: "Payment failed for {subject_id}".to_string(),
        },
    )])
}

fn default_friction_categories() -> BTreeMap<String, FrictionCategory> {
    BTreeMap::from([
        ("ESCALATION_RAISED".to_string(), FrictionCategory::Escalations),
        ("MANUAL_INTERVENTION".to_string(), FrictionCategory::Interventions),
        ("EXCEPTION_RAISED".to_string(), FrictionCategory::Exceptions),
        ("QUESTION_ASKED".to_string(), FrictionCategory::Questions),
    ])
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            kill_cooldown_minutes: default_kill_cooldown_minutes(),
            kill_settle_ms: default_kill_settle_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            high_decisions_cap: default_high_decisions_cap(),
            friction: ThresholdPolicy::default(),
            input_schema: InputSchema::default(),
            decision_triggers: default_decision_triggers(),
            friction_categories: default_friction_categories(),
            export_path: None,
            log_level: default_log_level(),
        }
    }
}

impl WorkflowConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: WorkflowConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ttl_hours == 0 {
            return Err(ConfigError::invalid("ttl_hours must be > 0"));
        }
        if self.ttl_hours > MAX_TTL_HOURS {
            return Err(ConfigError::invalid(format!(
                "ttl_hours must be <= {}",
                MAX_TTL_HOURS
            )));
        }

        if self.kill_cooldown_minutes > MAX_KILL_COOLDOWN_MINUTES {
            return Err(ConfigError::invalid(format!(
                "kill_cooldown_minutes must be <= {}",
                MAX_KILL_COOLDOWN_MINUTES
            )));
        }

        if self.kill_settle_ms > MAX_KILL_SETTLE_MS {
            return Err(ConfigError::invalid(format!(
                "kill_settle_ms must be <= {}",
                MAX_KILL_SETTLE_MS
            )));
        }

        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid("sweep_interval_ms must be > 0"));
        }

        if self.high_decisions_cap == 0 {
            return Err(ConfigError::invalid("high_decisions_cap must be > 0"));
        }

        for (category, threshold) in self.friction.thresholds() {
            if threshold == 0 {
                return Err(ConfigError::invalid(format!(
                    "friction threshold for '{}' must be > 0",
                    category
                )));
            }
        }

        if self.input_schema.version.trim().is_empty() {
            return Err(ConfigError::invalid("input_schema.version must not be empty"));
        }

        for field in REQUIRED_FIELDS {
            if !self.input_schema.required_fields.iter().any(|f| f == field) {
                return Err(ConfigError::invalid(format!(
                    "input_schema.required_fields must include '{}'",
                    field
                )));
            }
        }

        if let Some(reserved) = self
            .input_schema
            .allowed_events
            .iter()
            .find(|e| FactKind::parse(e.as_str()).is_some())
        {
            return Err(ConfigError::invalid(format!(
                "input_schema.allowed_events must not include engine fact '{}'",
                reserved
            )));
        }

        for event_type in self.decision_triggers.keys() {
            if !self.input_schema.allows(event_type) {
                return Err(ConfigError::invalid(format!(
                    "decision trigger '{}' is not an allowed event",
                    event_type
                )));
            }
        }

        for event_type in self.friction_categories.keys() {
            if !self.input_schema.allows(event_type) {
                return Err(ConfigError::invalid(format!(
                    "friction category for '{}' is not an allowed event",
                    event_type
                )));
            }
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::invalid(format!(
                "Invalid log_level: '{}'",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Decision lifetime. Clamped to `MAX_TTL_HOURS` for configs built
    /// without `validate`.
    pub fn ttl(&self) -> chrono::Duration {
        bounded(self.ttl_hours, MAX_TTL_HOURS, chrono::Duration::try_hours)
    }

    /// Rule cooldown, clamped to `MAX_KILL_COOLDOWN_MINUTES`.
    pub fn kill_cooldown(&self) -> chrono::Duration {
        bounded(
            self.kill_cooldown_minutes,
            MAX_KILL_COOLDOWN_MINUTES,
            chrono::Duration::try_minutes,
        )
    }

    /// Kill settle delay, clamped to `MAX_KILL_SETTLE_MS`.
    pub fn kill_settle(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.kill_settle_ms.min(MAX_KILL_SETTLE_MS))
    }

    /// `kill_settle` as a calendar offset.
    pub fn kill_settle_offset(&self) -> chrono::Duration {
        bounded(
            self.kill_settle_ms,
            MAX_KILL_SETTLE_MS,
            chrono::Duration::try_milliseconds,
        )
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms)
    }

    /// Friction routing table built from `friction_categories`.
    pub fn routing(&self) -> FrictionRouting {
        FrictionRouting::new(
            self.friction_categories
                .iter()
                .map(|(event, category)| (event.clone(), *category))
                .collect(),
        )
    }

    /// Minimum log severity. Falls back to INFO; `validate` rejects bad
    /// values before this is reached.
    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}

fn bounded(
    value: u64,
    max: u64,
    to_delta: fn(i64) -> Option<chrono::Duration>,
) -> chrono::Duration {
    i64::try_from(value.min(max))
        .ok()
        .and_then(to_delta)
        .unwrap_or_else(chrono::Duration::zero)
}
