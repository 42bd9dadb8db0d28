//! # Audit Recorder
//!
//! Wraps one orchestration run so that exactly one audit record is written
//! for it, whatever the outcome:
//!
//! | outcome                     | status recorded         |
//! |-----------------------------|-------------------------|
//! | success                     | 200                     |
//! | classified remote failure   | the mirrored HTTP code  |
//! | anything else, incl. panics | 500                     |
//!
//! A failed audit write is logged and counted. It never changes what the
//! caller receives.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::observability::{MetricsRegistry, Timer};
use crate::provisioning::{ProvisionError, ProvisionResult};

use super::errors::AuditResult;
use super::record::{AuditRecord, AuditSubject, RequestMetadata};
use super::store::AuditStore;

/// Caller context attached to an audited run
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub metadata: RequestMetadata,
    /// When the inbound request arrived; drives `api_response_time_ms`
    pub received_at: Option<Instant>,
}

impl AuditContext {
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            metadata,
            received_at: None,
        }
    }

    pub fn received_at(mut self, at: Instant) -> Self {
        self.received_at = Some(at);
        self
    }
}

/// What an audited run produced
#[derive(Debug)]
pub struct AuditedOutcome<T> {
    pub result: ProvisionResult<T>,
    /// Status returned to the caller, and stored on the record
    pub status: StatusCode,
    pub duration_ms: u64,
    /// `None` when the audit write failed
    pub audit_id: Option<Uuid>,
}

/// Writes one audit record per run
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    metrics: Arc<MetricsRegistry>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Persist one record and return its id
    #[allow(clippy::too_many_arguments)]
    pub async fn record<S: AuditSubject + ?Sized>(
        &self,
        subject: &S,
        response: Value,
        status: i32,
        error: Option<&str>,
        duration_ms: u64,
        metadata: &RequestMetadata,
        api_response_time_ms: Option<u64>,
    ) -> AuditResult<Uuid> {
        let mut record = AuditRecord::new(subject, response, status)?
            .with_duration_ms(duration_ms)
            .with_metadata(metadata)
            .with_api_response_time_ms(api_response_time_ms);
        if let Some(error) = error {
            record = record.with_error(error);
        }

        self.store.insert(&record).await?;
        self.metrics.increment_audit_writes();
        tracing::info!(
            event = "audit_recorded",
            audit_id = %record.id,
            store = self.store.kind(),
            http_status_code = status,
            "Metadata log inserted"
        );
        Ok(record.id)
    }

    /// Drive `fut` to completion and audit it exactly once.
    ///
    /// A panic inside `fut` becomes an unclassified failure.
    pub async fn run<S, T, F>(&self, subject: &S, context: &AuditContext, fut: F) -> AuditedOutcome<T>
    where
        S: AuditSubject + ?Sized,
        T: Serialize,
        F: Future<Output = ProvisionResult<T>>,
    {
        self.metrics.increment_runs_started();
        let timer = Timer::new();

        let result = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(event = "orchestration_panic", error = %message, "run panicked");
                Err(ProvisionError::unclassified(message))
            }
        };
        let duration_ms = timer.elapsed_ms();

        let (status, response, error) = match &result {
            Ok(outcome) => {
                self.metrics.increment_runs_succeeded();
                let response = serde_json::to_value(outcome).unwrap_or_else(|_| json!({}));
                (StatusCode::OK, response, None)
            }
            Err(err) => {
                self.metrics.increment_runs_failed();
                let status = err.status_code();
                let message = err.to_string();
                let response = json!({ "error": message, "code": status.as_u16() });
                (status, response, Some(message))
            }
        };

        let api_response_time_ms = context
            .received_at
            .map(|at| at.elapsed().as_millis() as u64);

        let audit_id = match self
            .record(
                subject,
                response,
                i32::from(status.as_u16()),
                error.as_deref(),
                duration_ms,
                &context.metadata,
                api_response_time_ms,
            )
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                self.metrics.increment_audit_write_failures();
                tracing::error!(
                    event = "audit_write_failed",
                    store = self.store.kind(),
                    error = %err,
                    "Failed to insert metadata log"
                );
                None
            }
        };

        AuditedOutcome {
            result,
            status,
            duration_ms,
            audit_id,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("internal error: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("internal error: {}", message)
    } else {
        "internal error".to_string()
    }
}
