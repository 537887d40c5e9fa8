//! Navigation subsystem
//!
//! A page registry plus a pure state machine over it.
//!
//! - Manual jumps are validated against the registry
//! - Forced and system transitions bypass the registry
//! - The machine has no terminal state

mod page;
mod state;

pub use page::{Accessibility, PageId, PageRegistry, PageSpec};
pub use state::{ApproveFlow, NavAction, NavigationState, RiskJump};
