//! CLI command implementations
//!
//! Each command loads [`ServiceConfig`], installs logging, builds what it
//! needs and runs on a fresh tokio runtime.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::audit::{AuditContext, AuditRecorder};
use crate::config::ServiceConfig;
use crate::http_server::{AppState, HttpServer, ProcessRequest};
use crate::load_test::{run_load_test, LoadTestConfig};
use crate::observability::{logging, MetricsRegistry};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_payload, write_json};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    match cmd {
        Command::Serve { env_file, port } => runtime.block_on(serve(env_file.as_deref(), port)),
        Command::Provision { env_file, payload } => {
            runtime.block_on(provision(env_file.as_deref(), &payload))
        }
        Command::Audit { env_file } => runtime.block_on(audit(env_file.as_deref())),
        Command::LoadTest {
            env_file,
            users,
            provision,
        } => runtime.block_on(load_test(env_file.as_deref(), users, provision)),
    }
}

fn load_config(env_file: Option<&Path>) -> CliResult<ServiceConfig> {
    let config = ServiceConfig::load(env_file)?;
    logging::init(config.log_format);
    tracing::debug!(
        host = %config.remote.host,
        audit_store = config.audit.name(),
        "configuration loaded"
    );
    Ok(config)
}

async fn build_recorder(config: &ServiceConfig, metrics: Arc<MetricsRegistry>) -> CliResult<AuditRecorder> {
    let store = config.build_audit_store().await?;
    Ok(AuditRecorder::new(store, metrics))
}

/// Run the HTTP API until interrupted
pub async fn serve(env_file: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(env_file)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let metrics = Arc::new(MetricsRegistry::new());
    let provisioner = config.build_provisioner(metrics.clone())?;
    let recorder = build_recorder(&config, metrics.clone()).await?;

    let server = HttpServer::new(
        config.server.clone(),
        AppState::new(provisioner, recorder, metrics),
    );
    server
        .start()
        .await
        .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
}

/// Provision one payload file, audit it, and print the outcome
pub async fn provision(env_file: Option<&Path>, payload_path: &Path) -> CliResult<()> {
    let config = load_config(env_file)?;
    let request: ProcessRequest = read_payload(payload_path)?;

    let metrics = Arc::new(MetricsRegistry::new());
    let provisioner = config.build_provisioner(metrics.clone())?;
    let recorder = build_recorder(&config, metrics).await?;

    let context = AuditContext::new(request.metadata.clone()).received_at(Instant::now());
    let outcome = recorder
        .run(&request.payload, &context, provisioner.provision(&request.payload))
        .await;

    match outcome.result {
        Ok(result) => write_json(&result),
        Err(err) => {
            write_json(&serde_json::json!({
                "error": err.to_string(),
                "code": outcome.status.as_u16(),
            }))?;
            Err(CliError::provision_failed(err.to_string()))
        }
    }
}

/// Print every audit record
pub async fn audit(env_file: Option<&Path>) -> CliResult<()> {
    let config = load_config(env_file)?;
    let store = config.build_audit_store().await?;
    let records = store.query().await?;
    write_json(&records)
}

/// Run the audit lag harness and print its report
pub async fn load_test(env_file: Option<&Path>, users: usize, provision: bool) -> CliResult<()> {
    let config = load_config(env_file)?;
    let metrics = Arc::new(MetricsRegistry::new());
    let recorder = build_recorder(&config, metrics.clone()).await?;
    let provisioner = if provision {
        Some(config.build_provisioner(metrics)?)
    } else {
        None
    };

    let mut harness = LoadTestConfig::new(users);
    harness.provision = provision;
    let report = run_load_test(recorder, provisioner, harness).await;
    write_json(&report)
}
