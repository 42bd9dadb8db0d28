//! # Audit Load Test
//!
//! Simulates concurrent callers. Each one runs a single audited cycle and
//! then polls the audit store until its record is readable, measuring the
//! lag between submission and visibility.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

use crate::audit::{AuditContext, AuditRecorder, RequestMetadata};
use crate::provisioning::{
    BusinessMetadata, ProvisionOutcome, Provisioner, ProvisioningRequest, StorageSetup,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    pub users: usize,
    /// Run a real provisioning flow instead of a canned success
    pub provision: bool,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl LoadTestConfig {
    pub fn new(users: usize) -> Self {
        Self {
            users,
            provision: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Result for one simulated caller
#[derive(Debug, Clone, Serialize)]
pub struct UserResult {
    pub index: usize,
    pub status: u16,
    pub record_id: Option<Uuid>,
    /// `None` when the record never became readable
    pub lag_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadTestReport {
    pub users: usize,
    pub found: usize,
    pub missed: usize,
    pub max_lag_ms: Option<u64>,
    pub mean_lag_ms: Option<u64>,
    pub results: Vec<UserResult>,
}

impl LoadTestReport {
    fn from_results(users: usize, mut results: Vec<UserResult>) -> Self {
        results.sort_by_key(|r| r.index);
        let lags: Vec<u64> = results.iter().filter_map(|r| r.lag_ms).collect();
        let found = lags.len();
        Self {
            users,
            found,
            missed: results.len() - found,
            max_lag_ms: lags.iter().copied().max(),
            mean_lag_ms: (found > 0).then(|| lags.iter().sum::<u64>() / found as u64),
            results,
        }
    }
}

/// Synthetic study payload for caller `index`
pub fn synthetic_payload(index: usize) -> ProvisioningRequest {
    ProvisioningRequest {
        business_metadata: BusinessMetadata {
            product_name: format!("Product-{}", index),
            study: format!("Study-{}", index),
            study_type: "Type-A".to_string(),
        },
        storage_setup: StorageSetup {
            data_schemas: Vec::new(),
            volume_directories: Default::default(),
        },
        access_controls: None,
    }
}

async fn simulate_user(
    index: usize,
    recorder: AuditRecorder,
    provisioner: Option<Provisioner>,
    config: LoadTestConfig,
) -> UserResult {
    let payload = synthetic_payload(index);
    let context = AuditContext::new(RequestMetadata {
        request_by: Some(format!("load-test-{}", index)),
        ..Default::default()
    });
    let start = Instant::now();

    let outcome = match provisioner {
        Some(provisioner) if config.provision => {
            recorder
                .run(&payload, &context, provisioner.provision(&payload))
                .await
        }
        _ => {
            recorder
                .run(&payload, &context, async {
                    Ok(ProvisionOutcome::success("Inserted", Vec::new()))
                })
                .await
        }
    };

    let Some(record_id) = outcome.audit_id else {
        tracing::error!(user = index, "audit record was not written");
        return UserResult {
            index,
            status: outcome.status.as_u16(),
            record_id: None,
            lag_ms: None,
        };
    };

    let lag_ms = wait_for_record(&recorder, record_id, start, &config).await;
    match lag_ms {
        Some(lag_ms) => tracing::info!(user = index, %record_id, lag_ms, "record retrieved"),
        None => tracing::warn!(
            user = index,
            %record_id,
            max_wait_ms = config.max_wait.as_millis() as u64,
            "record not found in time"
        ),
    }

    UserResult {
        index,
        status: outcome.status.as_u16(),
        record_id: Some(record_id),
        lag_ms,
    }
}

async fn wait_for_record(
    recorder: &AuditRecorder,
    record_id: Uuid,
    start: Instant,
    config: &LoadTestConfig,
) -> Option<u64> {
    let deadline = start + config.max_wait;
    loop {
        match recorder.store().fetch(record_id).await {
            Ok(Some(_)) => return Some(start.elapsed().as_millis() as u64),
            Ok(None) => {}
            Err(err) => tracing::warn!(%record_id, error = %err, "audit lookup failed"),
        }
        if Instant::now() + config.poll_interval > deadline {
            return None;
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Run `config.users` callers concurrently and collect their lag
pub async fn run_load_test(
    recorder: AuditRecorder,
    provisioner: Option<Provisioner>,
    config: LoadTestConfig,
) -> LoadTestReport {
    tracing::info!(users = config.users, provision = config.provision, "starting load test");

    let mut tasks = JoinSet::new();
    for index in 0..config.users {
        tasks.spawn(simulate_user(
            index,
            recorder.clone(),
            provisioner.clone(),
            config.clone(),
        ));
    }

    let mut results = Vec::with_capacity(config.users);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => tracing::error!(error = %err, "load test task failed"),
        }
    }

    let report = LoadTestReport::from_results(config.users, results);
    tracing::info!(
        found = report.found,
        missed = report.missed,
        max_lag_ms = ?report.max_lag_ms,
        "load test finished"
    );
    report
}
