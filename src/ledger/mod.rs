//! Fact ledger
//!
//! The single source of truth for everything the engine did.
//!
//! - Append-only: records are never edited or removed
//! - Totally ordered by insertion
//! - Counters elsewhere are projections of this log

mod errors;
mod export;
mod fact;
mod log;
mod projection;

pub use errors::{ExportError, ExportResult};
pub use export::{export_jsonl, read_jsonl};
pub use fact::{Fact, FactKind, FactSource};
pub use log::{FactLedger, FactReceiver};
pub use projection::{LedgerProjection, Mismatch, Reconciliation};
