//! ledgergate - A strict, deterministic decision-approval workflow engine
//!
//! A page-navigation state machine coupled to an append-only fact ledger,
//! a TTL expiry sweep, a weekly budget gate and a friction-triggered
//! escalation jump.

pub mod budget;
pub mod cli;
pub mod clock;
pub mod config;
pub mod friction;
pub mod ledger;
pub mod navigation;
pub mod observability;
pub mod service;
pub mod ttl;
pub mod workflow;
