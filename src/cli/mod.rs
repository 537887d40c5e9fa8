//! CLI module for ledgergate
//!
//! Provides command-line interface for:
//! - init: Write a default configuration
//! - check: Validate a configuration
//! - run: Serve lifecycle commands over stdin/stdout
//! - replay: Recompute counters from an exported snapshot

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{check, init, replay, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
pub use request::{dispatch, Request};
