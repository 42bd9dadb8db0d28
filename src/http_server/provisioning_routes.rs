//! Provisioning HTTP Routes
//!
//! - `POST /process` - study provisioning
//! - `POST /analysis-setup` - analysis workspace setup
//! - `POST /create-snapshot` - table snapshot
//!
//! Each request runs one audited orchestration. Optional caller metadata
//! (`request_by`, `description`, `business_justification`) sits next to
//! the payload fields in the same JSON object.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditContext, RequestMetadata};
use crate::provisioning::{AnalysisRequest, ProvisionOutcome, ProvisioningRequest, SnapshotRequest};

use super::errors::{ApiError, ApiResult};
use super::server::AppState;

/// A payload plus the caller metadata flattened beside it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditedRequest<P> {
    #[serde(flatten)]
    pub payload: P,
    #[serde(flatten)]
    pub metadata: RequestMetadata,
}

pub type ProcessRequest = AuditedRequest<ProvisioningRequest>;

pub fn provisioning_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process", post(process_handler))
        .route("/analysis-setup", post(analysis_setup_handler))
        .route("/create-snapshot", post(create_snapshot_handler))
        .with_state(state)
}

fn context(metadata: RequestMetadata, received_at: Instant) -> AuditContext {
    AuditContext::new(metadata).received_at(received_at)
}

async fn process_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<ProvisionOutcome>> {
    let received_at = Instant::now();
    let Json(request) = body.map_err(ApiError::from)?;

    let outcome = state
        .recorder
        .run(
            &request.payload,
            &context(request.metadata, received_at),
            state.provisioner.provision(&request.payload),
        )
        .await;
    Ok(Json(outcome.result?))
}

async fn analysis_setup_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AuditedRequest<AnalysisRequest>>, JsonRejection>,
) -> ApiResult<Json<ProvisionOutcome>> {
    let received_at = Instant::now();
    let Json(request) = body.map_err(ApiError::from)?;

    let outcome = state
        .recorder
        .run(
            &request.payload,
            &context(request.metadata, received_at),
            state.provisioner.setup_analysis(&request.payload),
        )
        .await;
    Ok(Json(outcome.result?))
}

async fn create_snapshot_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AuditedRequest<SnapshotRequest>>, JsonRejection>,
) -> ApiResult<Json<ProvisionOutcome>> {
    let received_at = Instant::now();
    let Json(request) = body.map_err(ApiError::from)?;

    let outcome = state
        .recorder
        .run(
            &request.payload,
            &context(request.metadata, received_at),
            state.provisioner.create_snapshot(&request.payload),
        )
        .await;
    Ok(Json(outcome.result?))
}
