//! # Study Provisioning
//!
//! Strictly ordered steps, each keyed on the catalog (`lower(product_name)`)
//! and study resolved once at entry:
//!
//! 1. catalog existence check (hard precondition)
//! 2. `{study}_{suffix}` schema per data schema
//! 3. `vol_{suffix}` volume per data schema (except `volumes`) in `{study}_volumes`
//! 4. directories inside each `vol_{type}`
//! 5. one grant call per access-control entry
//!
//! The first failing step aborts the rest. Resources created before the
//! failure are left in place.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access::AccessMap;
use crate::observability::{MetricsRegistry, OperationScope, Timer};
use crate::remote::{PermissionChange, RemoteCallClient, RemoteError};

use super::errors::ProvisionResult;
use super::grants::{resolve_grant, InvalidGrant, PrincipalKind};
use super::payload::{EntityAccessControl, ProvisioningRequest, VOLUMES_SUFFIX};

/// Default interval between snapshot status polls
pub const DEFAULT_SNAPSHOT_POLL: Duration = Duration::from_secs(3);

/// Default upper bound on waiting for a snapshot statement
pub const DEFAULT_SNAPSHOT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Behaviour switches shared by every flow
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// Create missing account groups before granting to them
    pub ensure_groups: bool,
    /// SQL warehouse used by snapshot statements
    pub warehouse_id: Option<String>,
    pub snapshot_poll: Duration,
    pub snapshot_max_wait: Duration,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            ensure_groups: false,
            warehouse_id: None,
            snapshot_poll: DEFAULT_SNAPSHOT_POLL,
            snapshot_max_wait: DEFAULT_SNAPSHOT_MAX_WAIT,
        }
    }
}

/// Successful result of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    pub status: String,
    pub message: String,
    /// Skipped grants and similar non-fatal findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProvisionOutcome {
    pub fn success(message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            warnings,
        }
    }
}

/// Drives the provisioning flows against one workspace
#[derive(Clone)]
pub struct Provisioner {
    pub(super) client: RemoteCallClient,
    pub(super) access: Arc<AccessMap>,
    pub(super) options: ProvisionOptions,
    pub(super) metrics: Arc<MetricsRegistry>,
}

impl Provisioner {
    pub fn new(client: RemoteCallClient, access: Arc<AccessMap>) -> Self {
        Self {
            client,
            access,
            options: ProvisionOptions::default(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn client(&self) -> &RemoteCallClient {
        &self.client
    }

    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Fail with 404 unless `catalog` is listed
    pub(super) async fn ensure_catalog(&self, catalog: &str) -> ProvisionResult<()> {
        let catalogs = OperationScope::begin("list_catalogs")
            .observe(self.client.list_catalogs())
            .await?;

        if !catalogs.contains(catalog) {
            tracing::error!(event = "catalog_missing", catalog, "Catalog not found");
            return Err(RemoteError::NotFound(format!("Catalog {} not found", catalog)).into());
        }
        Ok(())
    }

    pub(super) async fn create_schema(&self, schema: &str, catalog: &str) -> ProvisionResult<()> {
        OperationScope::begin("create_schema")
            .field("schema", schema)
            .field("catalog", catalog)
            .observe(self.client.create_schema(schema, catalog))
            .await?;
        Ok(())
    }

    pub(super) async fn create_volume(
        &self,
        volume: &str,
        schema: &str,
        catalog: &str,
    ) -> ProvisionResult<()> {
        OperationScope::begin("create_volume")
            .field("volume", volume)
            .field("schema", schema)
            .field("catalog", catalog)
            .observe(self.client.create_volume(volume, schema, catalog))
            .await?;
        Ok(())
    }

    pub(super) async fn create_directory(
        &self,
        directory: &str,
        volume: &str,
        schema: &str,
        catalog: &str,
    ) -> ProvisionResult<()> {
        OperationScope::begin("create_directory")
            .field("directory", directory)
            .field("volume", volume)
            .field("schema", schema)
            .field("catalog", catalog)
            .observe(self.client.create_directory(directory, volume, schema, catalog))
            .await?;
        Ok(())
    }

    pub(super) async fn grant(
        &self,
        full_name: &str,
        changes: &[PermissionChange],
    ) -> ProvisionResult<()> {
        OperationScope::begin("grant_permissions")
            .field("object_type", "schema")
            .field("full_name", full_name)
            .field("changes_count", changes.len())
            .observe(self.client.grant_permissions("schema", full_name, changes))
            .await?;
        Ok(())
    }

    pub(super) fn skip_invalid(&self, invalid: InvalidGrant, warnings: &mut Vec<String>) {
        invalid.log();
        self.metrics.increment_invalid_access_levels();
        warnings.push(invalid.to_string());
    }

    /// Account display name to grant to, creating the group if enabled
    async fn principal_for_group(&self, group: &str) -> ProvisionResult<String> {
        if !self.options.ensure_groups {
            return Ok(group.to_string());
        }
        let resolved = OperationScope::begin("ensure_group")
            .field("group", group)
            .observe(self.client.ensure_group_exists(group))
            .await?;
        Ok(resolved
            .get("displayName")
            .and_then(|v| v.as_str())
            .unwrap_or(group)
            .to_string())
    }

    /// Build the change list for one entry; invalid levels are skipped
    async fn collect_changes(
        &self,
        control: &EntityAccessControl,
        warnings: &mut Vec<String>,
    ) -> ProvisionResult<Vec<PermissionChange>> {
        let mut changes = Vec::with_capacity(control.groups.len() + control.users.len());

        for entry in &control.groups {
            match resolve_grant(self.access.as_ref(), PrincipalKind::Group, &entry.group, &entry.access) {
                Ok(mut change) => {
                    change.principal = self.principal_for_group(&entry.group).await?;
                    changes.push(change);
                }
                Err(invalid) => self.skip_invalid(invalid, warnings),
            }
        }

        for entry in &control.users {
            match resolve_grant(self.access.as_ref(), PrincipalKind::User, &entry.user, &entry.access) {
                Ok(change) => changes.push(change),
                Err(invalid) => self.skip_invalid(invalid, warnings),
            }
        }

        Ok(changes)
    }

    /// Provision every resource a study payload describes
    pub async fn provision(&self, payload: &ProvisioningRequest) -> ProvisionResult<ProvisionOutcome> {
        let timer = Timer::new();
        let catalog = payload.catalog_name();
        let study = payload.study();
        let setup = &payload.storage_setup;

        tracing::info!(
            event = "process_payload_start",
            catalog = %catalog,
            study,
            "Starting study provisioning"
        );

        // 1. Catalog must exist
        self.ensure_catalog(&catalog).await?;

        // 2. Schemas
        for suffix in &setup.data_schemas {
            let schema = format!("{}_{}", study, suffix);
            self.create_schema(&schema, &catalog).await?;
        }

        // 3. Volumes under {study}_volumes
        let volume_schema = format!("{}_{}", study, VOLUMES_SUFFIX);
        for suffix in setup.data_schemas.iter().filter(|s| s.as_str() != VOLUMES_SUFFIX) {
            let volume = format!("vol_{}", suffix);
            self.create_volume(&volume, &volume_schema, &catalog).await?;
        }

        // 4. Directories
        for (volume_type, directories) in &setup.volume_directories {
            let volume = format!("vol_{}", volume_type);
            for directory in directories {
                self.create_directory(directory, &volume, &volume_schema, &catalog)
                    .await?;
            }
        }

        // 5. Access controls
        let mut warnings = Vec::new();
        if let Some(controls) = &payload.access_controls {
            for (schema_key, control) in controls {
                let changes = self.collect_changes(control, &mut warnings).await?;
                let full_name = format!("{}.{}_{}", catalog, study, schema_key);
                self.grant(&full_name, &changes).await?;
            }
        }

        tracing::info!(
            event = "process_payload_completed",
            duration_ms = timer.elapsed_ms(),
            warnings = warnings.len(),
            "Completed study provisioning"
        );

        Ok(ProvisionOutcome::success(
            "All resources created successfully",
            warnings,
        ))
    }
}
