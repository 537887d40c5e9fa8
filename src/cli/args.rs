//! CLI argument definitions using clap
//!
//! Commands:
//! - ledgergate init --config <path>
//! - ledgergate check --config <path>
//! - ledgergate run --config <path> [--snapshot <path>]
//! - ledgergate replay --snapshot <path> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ledgergate - A strict, deterministic decision-approval workflow engine
#[derive(Parser, Debug)]
#[command(name = "ledgergate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./ledgergate.json")]
        config: PathBuf,
    },

    /// Load and validate a configuration file
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./ledgergate.json")]
        config: PathBuf,
    },

    /// Run the workflow, one JSON command per stdin line
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./ledgergate.json")]
        config: PathBuf,

        /// Where to write the final snapshot on EOF
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Replay an exported snapshot and check its counters
    Replay {
        /// Snapshot written by `run --snapshot`
        #[arg(long)]
        snapshot: PathBuf,

        /// Configuration supplying the friction routing (defaults if absent)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
