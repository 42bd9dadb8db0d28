//! # Provisioning
//!
//! Orchestration of the study, analysis and snapshot flows over the
//! remote workspace API.
//!
//! # Guarantees
//!
//! - Steps run strictly in order, one remote call at a time
//! - A missing catalog fails the run before any resource is created
//! - The first failing step aborts the run; nothing is rolled back
//! - Unknown access levels are skipped with a warning, never fatal

mod analysis;
mod errors;
mod grants;
mod orchestrator;
mod payload;
mod snapshot;

pub use errors::{ProvisionError, ProvisionResult};
pub use grants::{resolve_grant, InvalidGrant, PrincipalKind};
pub use orchestrator::{
    ProvisionOptions, ProvisionOutcome, Provisioner, DEFAULT_SNAPSHOT_MAX_WAIT,
    DEFAULT_SNAPSHOT_POLL,
};
pub use payload::{
    AnalysisAccessControl, AnalysisBusinessMetadata, AnalysisRequest, AnalysisStorageSetup,
    BusinessMetadata, EntityAccessControl, GroupAccess, ProvisioningRequest, SnapshotRequest,
    StorageSetup, UserAccess, VOLUMES_SUFFIX,
};
