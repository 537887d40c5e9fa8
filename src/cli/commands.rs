//! CLI command implementations
//!
//! Each command loads configuration first and sets the log level from it.
//! Responses go to stdout as JSON lines; logs go to stderr.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::clock::SystemClock;
use crate::config::WorkflowConfig;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::service::WorkflowService;
use crate::workflow::{RiskLabelEnricher, WorkflowSnapshot};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};
use super::request::{dispatch, Request};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Check { config } => check(&config),
        Command::Run { config, snapshot } => serve(&config, snapshot.as_deref()),
        Command::Replay { snapshot, config } => replay(&snapshot, config.as_deref()),
    }
}

/// Write the default configuration. Never overwrites.
pub fn init(config_path: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized());
    }

    WorkflowConfig::default().save(config_path)?;

    write_response(json!({
        "initialized": true,
        "config": config_path.display().to_string(),
    }))
}

/// Load and validate a configuration file.
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    write_response(json!({"valid": true, "config": config}))
}

/// Run the workflow service over stdin/stdout until EOF.
pub fn serve(config_path: &Path, snapshot_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let service = WorkflowService::start(
            config,
            Arc::new(SystemClock),
            Some(Arc::new(RiskLabelEnricher)),
        );

        for request in read_requests() {
            let result = match request.and_then(Request::parse) {
                Ok(request) => dispatch(&service, request).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(data) => write_response(data)?,
                Err(e) => write_error(e.code_str(), e.message())?,
            }
        }

        let report = service.shutdown().await?;
        if let Some(path) = snapshot_path {
            report.snapshot.write_to(path)?;
        }

        write_response(json!({
            "shutdown": true,
            "facts": report.snapshot.facts.len(),
            "facts_exported": report.facts_exported,
            "snapshot": snapshot_path.map(|p| p.display().to_string()),
        }))
    })
}

/// Replay a snapshot's facts and compare against its stored counters.
pub fn replay(snapshot_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => WorkflowConfig::default(),
    };

    let snapshot = WorkflowSnapshot::read_from(snapshot_path)?;
    let reconciliation = snapshot.replay(&config.routing());
    let consistent = reconciliation.is_consistent();
    let mismatches = reconciliation.mismatches.len();

    write_response(json!({
        "consistent": consistent,
        "reconciliation": reconciliation,
    }))?;

    if consistent {
        Ok(())
    } else {
        Err(CliError::replay_mismatch(mismatches))
    }
}

fn load_config(path: &Path) -> CliResult<WorkflowConfig> {
    let config = WorkflowConfig::load(path)?;
    Logger::set_min_severity(config.log_severity());

    let path = path.display().to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);
    Ok(config)
}
