//! CLI argument definitions using clap
//!
//! Commands:
//! - study-provisioner serve
//! - study-provisioner provision --payload <path>
//! - study-provisioner audit
//! - study-provisioner load-test --users <n>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Study provisioning service for a lakehouse workspace
#[derive(Parser, Debug)]
#[command(name = "study-provisioner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// KEY=VALUE settings file, overlaid by the environment
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Override SERVICE_PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Provision one study from a JSON payload file and exit
    Provision {
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Study payload; caller metadata fields may sit beside it
        #[arg(long)]
        payload: PathBuf,
    },

    /// Print the audit trail as JSON
    Audit {
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Measure audit write-to-read lag under concurrent callers
    LoadTest {
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Number of simulated callers
        #[arg(long, default_value_t = 10)]
        users: usize,

        /// Run real provisioning against the workspace
        #[arg(long)]
        provision: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
