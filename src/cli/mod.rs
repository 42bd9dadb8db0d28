//! CLI module for the provisioner
//!
//! Provides command-line interface for:
//! - serve: run the HTTP API
//! - provision: one-shot study provisioning from a payload file
//! - audit: dump the audit trail
//! - load-test: audit write-to-read lag harness

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{audit, load_test, provision, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_payload, write_json};
