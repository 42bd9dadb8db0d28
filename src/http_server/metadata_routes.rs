//! Audit Metadata HTTP Routes
//!
//! `GET /get-metadata` returns every audit record with the store latency.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::audit::AuditRecord;
use crate::observability::Timer;

use super::errors::{ApiError, ApiResult};
use super::server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub latency_ms: u64,
    pub count: usize,
    pub data: Vec<AuditRecord>,
}

pub fn metadata_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/get-metadata", get(get_metadata_handler))
        .with_state(state)
}

async fn get_metadata_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<MetadataResponse>> {
    let timer = Timer::new();
    let data = state.recorder.store().query().await.map_err(|err| {
        tracing::error!(event = "fetch_metadata_failed", error = %err, "Failed to read metadata");
        ApiError::from(err)
    })?;
    let latency_ms = timer.elapsed_ms();

    if data.is_empty() {
        return Err(ApiError::NotFound("No metadata found".to_string()));
    }

    tracing::info!(event = "fetch_metadata", count = data.len(), latency_ms, "Metadata log read");
    Ok(Json(MetadataResponse {
        latency_ms,
        count: data.len(),
        data,
    }))
}
