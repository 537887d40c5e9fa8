//! Append-only fact ledger
//!
//! - Append never fails and returns the stored record
//! - Sequence numbers and timestamps are strictly increasing
//! - Sequence, timestamp and insertion are assigned under one write lock,
//!   so a total order exists and no reader sees a half-written record
//! - Readers share the lock and never block each other
//!
//! Subscribers receive every appended fact, in order, over an unbounded
//! channel. Sending never blocks the appender.

use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::mpsc;

use super::fact::Fact;
use crate::clock::SharedClock;

/// Receiving end of a ledger subscription.
pub type FactReceiver = mpsc::UnboundedReceiver<Fact>;

type FactSender = mpsc::UnboundedSender<Fact>;

#[derive(Debug, Default)]
struct LedgerInner {
    facts: Vec<Fact>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// The ledger.
pub struct FactLedger {
    clock: SharedClock,
    inner: RwLock<LedgerInner>,
    subscribers: Mutex<Vec<FactSender>>,
}

impl FactLedger {
    /// Empty ledger stamping facts from `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            inner: RwLock::new(LedgerInner::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append a fact.
    pub fn append(
        &self,
        event_type: impl Into<String>,
        subject_id: impl Into<String>,
        value: Value,
        source: impl Into<String>,
    ) -> Fact {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let timestamp = match inner.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };

        let fact = Fact {
            seq: inner.facts.len() as u64 + 1,
            event_type: event_type.into(),
            subject_id: subject_id.into(),
            value,
            source: source.into(),
            timestamp,
        };

        inner.last_timestamp = Some(timestamp);
        inner.facts.push(fact.clone());

        // Still under the write lock: subscribers see ledger order
        self.publish(&fact);

        fact
    }

    fn publish(&self, fact: &Fact) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(fact.clone()).is_ok());
    }

    /// Subscribe to facts appended from now on.
    pub fn subscribe(&self) -> FactReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Drop every subscription. Receivers drain what was already sent and
    /// then end.
    pub fn close_subscribers(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Copy of every fact, insertion order.
    pub fn facts(&self) -> Vec<Fact> {
        self.read(|facts| facts.to_vec())
    }

    /// Facts with `seq > since`.
    pub fn facts_since(&self, since: u64) -> Vec<Fact> {
        self.read(|facts| facts.iter().filter(|f| f.seq > since).cloned().collect())
    }

    /// Facts of one event type.
    pub fn facts_of(&self, event_type: &str) -> Vec<Fact> {
        self.read(|facts| {
            facts
                .iter()
                .filter(|f| f.event_type == event_type)
                .cloned()
                .collect()
        })
    }

    /// Number of facts of one event type.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.read(|facts| facts.iter().filter(|f| f.event_type == event_type).count())
    }

    /// Most recent fact.
    pub fn last(&self) -> Option<Fact> {
        self.read(|facts| facts.last().cloned())
    }

    /// Run `f` over the facts without copying them.
    pub fn read<R>(&self, f: impl FnOnce(&[Fact]) -> R) -> R {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&inner.facts)
    }

    pub fn len(&self) -> usize {
        self.read(|facts| facts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FactLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactLedger").field("len", &self.len()).finish()
    }
}
