//! # HTTP Server Module
//!
//! Axum server exposing the provisioning flows and the audit trail.
//!
//! # Endpoints
//!
//! - `POST /process` - provision a study
//! - `POST /analysis-setup` - set up an analysis workspace
//! - `POST /create-snapshot` - snapshot a table
//! - `GET /get-metadata` - read the audit trail
//! - `/health`, `/observability/*` - health and metrics

pub mod config;
pub mod errors;
mod metadata_routes;
mod observability_routes;
mod provisioning_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use metadata_routes::MetadataResponse;
pub use observability_routes::HealthResponse;
pub use provisioning_routes::{AuditedRequest, ProcessRequest};
pub use server::{AppState, HttpServer};
