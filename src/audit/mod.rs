//! Request audit trail
//!
//! Every inbound provisioning request leaves exactly one record:
//! - What was asked (payload and caller metadata)
//! - What was answered (response body and status)
//! - How long it took
//!
//! Records are append-only. Stores:
//! - [`MemoryAuditStore`] for tests and local runs
//! - [`FileAuditStore`] as JSON lines, fsync per write
//! - [`PgAuditStore`] as the `metadata` table in Postgres

mod errors;
mod postgres;
mod record;
mod recorder;
mod store;

pub use errors::{AuditError, AuditResult};
pub use postgres::{PgAuditConfig, PgAuditStore};
pub use record::{AuditRecord, AuditSubject, BusinessFields, RequestMetadata};
pub use recorder::{AuditContext, AuditRecorder, AuditedOutcome};
pub use store::{AuditStore, FileAuditStore, MemoryAuditStore};
