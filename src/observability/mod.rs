//! Observability for the provisioner
//!
//! This module provides:
//! - Structured logging setup (`tracing`, JSON or pretty)
//! - Timed step scopes that log ok/fail with duration
//! - Process counters exposed over HTTP
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on orchestration control flow
//! 3. Logging failures never fail a request
//!
//! # Usage
//!
//! ```ignore
//! use study_provisioner::observability::{OperationScope, MetricsRegistry};
//!
//! let schema = OperationScope::begin("create_schema")
//!     .field("schema", "s1_raw")
//!     .observe(client.create_schema("s1_raw", "p"))
//!     .await?;
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_runs_started();
//! ```

pub mod logging;
mod metrics;
mod scope;

pub use logging::LogFormat;
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{OperationScope, Timer};
