//! # Remote Workspace API
//!
//! Client for the catalog, files, SQL and account APIs the provisioning
//! flows drive.
//!
//! # Layers
//!
//! - `transport` - one HTTP exchange (reqwest in production)
//! - `client` - retry, backoff and error classification
//! - `workspace` / `accounts` - fixed endpoint wrappers

mod accounts;
mod client;
mod errors;
pub mod mock;
mod retry;
mod transport;
mod workspace;

pub use client::{AttemptResult, CallOutcome, ClientConfig, RemoteCallClient, DEFAULT_TIMEOUT};
pub use errors::{RemoteError, RemoteResult, NO_STATUS};
pub use retry::{RetryPolicy, DEFAULT_BACKOFF, DEFAULT_RETRIES};
pub use transport::{RawResponse, RemoteRequest, ReqwestTransport, Transport, TransportError};
pub use workspace::{
    CatalogInfo, CatalogList, PermissionChange, StatementState, CATALOGS_ENDPOINT,
    DIRECTORIES_ENDPOINT, PERMISSIONS_ENDPOINT, SCHEMAS_ENDPOINT, STATEMENTS_ENDPOINT,
    TABLES_ENDPOINT, VOLUMES_ENDPOINT,
};
