//! Decision cards and the decision queue
//!
//! The queue is FIFO. Its head is the "current" decision that
//! approve/deny/defer act on. Cards leave the queue on approval, denial
//! or expiry; deferral moves a card to the tail.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enrichment::Enrichment;
use crate::budget::DecisionCost;

/// How hard a decision is to undo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reversibility {
    #[default]
    Reversible,
    PartiallyReversible,
    Irreversible,
}

/// How far the effects of a decision reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlastRadius {
    #[default]
    Local,
    Team,
    Global,
}

/// Long-term direction staged on the first approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Hold,
}

impl Direction {
    /// Parse `UP`, `DOWN` or `HOLD`, ignoring case and surrounding space.
    pub fn parse(s: &str) -> Option<Direction> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "HOLD" => Some(Direction::Hold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCard {
    pub id: Uuid,
    pub subject_id: String,
    pub subject_type: String,
    pub action_type: String,
    pub decision_cost: DecisionCost,
    pub reversibility: Reversibility,
    pub blast_radius: BlastRadius,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl DecisionCard {
    /// Strictly past its deadline at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }
}

/// FIFO queue of pending decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionQueue {
    cards: VecDeque<DecisionCard>,
}

impl DecisionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, card: DecisionCard) {
        self.cards.push_back(card);
    }

    /// The decision lifecycle actions operate on.
    pub fn current(&self) -> Option<&DecisionCard> {
        self.cards.front()
    }

    pub fn get(&self, id: Uuid) -> Option<&DecisionCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut DecisionCard> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<DecisionCard> {
        let index = self.cards.iter().position(|c| c.id == id)?;
        self.cards.remove(index)
    }

    /// Whether a card for the same subject and action is already pending.
    pub fn has_pending(&self, subject_id: &str, action_type: &str) -> bool {
        self.cards
            .iter()
            .any(|c| c.subject_id == subject_id && c.action_type == action_type)
    }

    /// Remove every card matching `pred`, keeping queue order for both the
    /// removed and the remaining cards.
    pub fn drain_where(&mut self, mut pred: impl FnMut(&DecisionCard) -> bool) -> Vec<DecisionCard> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.cards.len());
        for card in self.cards.drain(..) {
            if pred(&card) {
                removed.push(card);
            } else {
                kept.push_back(card);
            }
        }
        self.cards = kept;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecisionCard> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn card(subject: &str, deadline: DateTime<Utc>) -> DecisionCard {
        DecisionCard {
            id: Uuid::new_v4(),
            subject_id: subject.to_string(),
            subject_type: "account".to_string(),
            action_type: "RETRY_PAYMENT".to_string(),
            decision_cost: DecisionCost::Low,
            reversibility: Reversibility::Reversible,
            blast_radius: BlastRadius::Local,
            deadline,
            created_at: deadline - Duration::hours(24),
            summary: String::new(),
            enrichment: None,
        }
    }

    #[test]
    fn test_fifo_head_is_current() {
        let now = Utc::now();
        let mut q = DecisionQueue::new();
        let a = card("a", now);
        let b = card("b", now);
        q.push_back(a.clone());
        q.push_back(b.clone());

        assert_eq!(q.current().map(|c| c.id), Some(a.id));
        q.remove(a.id);
        assert_eq!(q.current().map(|c| c.id), Some(b.id));
    }

    #[test]
    fn test_drain_where_keeps_order() {
        let now = Utc::now();
        let mut q = DecisionQueue::new();
        for (s, h) in [("a", -2), ("b", 5), ("c", -1), ("d", 3)] {
            q.push_back(card(s, now + Duration::hours(h)));
        }

        let expired = q.drain_where(|c| c.is_expired(now));
        let expired: Vec<_> = expired.iter().map(|c| c.subject_id.as_str()).collect();
        assert_eq!(expired, vec!["a", "c"]);

        let left: Vec<_> = q.iter().map(|c| c.subject_id.as_str()).collect();
        assert_eq!(left, vec!["b", "d"]);
    }

    #[test]
    fn test_deadline_equal_to_now_is_not_expired() {
        let now = Utc::now();
        assert!(!card("a", now).is_expired(now));
        assert!(card("a", now).is_expired(now + Duration::microseconds(1)));
    }

    #[test]
    fn test_has_pending() {
        let mut q = DecisionQueue::new();
        q.push_back(card("acct-1", Utc::now()));
        assert!(q.has_pending("acct-1", "RETRY_PAYMENT"));
        assert!(!q.has_pending("acct-1", "REFUND"));
        assert!(!q.has_pending("acct-2", "RETRY_PAYMENT"));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse(" up "), Some(Direction::Up));
        assert_eq!(Direction::parse("HOLD"), Some(Direction::Hold));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::parse(""), None);
    }
}
