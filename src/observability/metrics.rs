//! Metrics registry for the provisioner
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide operational counters
///
/// All counters use Relaxed atomics; readers only need eventual values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Provisioning runs started (all flows)
    runs_started: AtomicU64,
    /// Runs that returned success
    runs_succeeded: AtomicU64,
    /// Runs that failed, classified or not
    runs_failed: AtomicU64,
    /// Remote call attempts issued
    remote_calls: AtomicU64,
    /// Backoff waits taken before a retry
    remote_retries: AtomicU64,
    /// Grants skipped for an unknown access level
    invalid_access_levels: AtomicU64,
    /// Audit rows written
    audit_writes: AtomicU64,
    /// Audit rows that failed to persist
    audit_write_failures: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Run metrics

    pub fn increment_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_succeeded(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Remote metrics

    pub fn increment_remote_calls(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_remote_retries(&self) {
        self.remote_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invalid_access_levels(&self) {
        self.invalid_access_levels.fetch_add(1, Ordering::Relaxed);
    }

    // Audit metrics

    pub fn increment_audit_writes(&self) {
        self.audit_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_audit_write_failures(&self) {
        self.audit_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            remote_retries: self.remote_retries.load(Ordering::Relaxed),
            invalid_access_levels: self.invalid_access_levels.load(Ordering::Relaxed),
            audit_writes: self.audit_writes.load(Ordering::Relaxed),
            audit_write_failures: self.audit_write_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub remote_calls: u64,
    pub remote_retries: u64,
    pub invalid_access_levels: u64,
    pub audit_writes: u64,
    pub audit_write_failures: u64,
}
