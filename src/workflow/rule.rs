//! Rules
//!
//! A rule is started once and killed at most once. Killed rules stay in
//! the registry for audit; nothing is ever deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rule status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleStatus {
    Running,
    Killed,
}

/// A rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub status: RuleStatus,
    pub started_at: DateTime<Utc>,
    pub killed_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl Rule {
    pub fn start(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: RuleStatus::Running,
            started_at: at,
            killed_at: None,
            cooldown_until: None,
        }
    }

    pub fn is_killed(&self) -> bool {
        self.status == RuleStatus::Killed
    }

    /// Whether the rule is still cooling down at `now`.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Consuming kill. Returns `None` if already killed.
    pub fn kill(self, at: DateTime<Utc>, cooldown_until: DateTime<Utc>) -> Option<Rule> {
        if self.is_killed() {
            return None;
        }
        Some(Rule {
            status: RuleStatus::Killed,
            killed_at: Some(at),
            cooldown_until: Some(cooldown_until),
            ..self
        })
    }
}

/// Rules in start order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn get(&self, id: Uuid) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Replace the stored rule with the same id.
    pub fn replace(&mut self, rule: Rule) {
        if let Some(slot) = self.rules.iter_mut().find(|r| r.id == rule.id) {
            *slot = rule;
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
