//! # Analysis Setup
//!
//! Lays an analysis workspace over an existing study:
//! `{study}_{analysis_type}_{layer}` schemas, one `{analysis_type}_vol`
//! volume inside `{study}_volumes`, its directories, then grants. Table
//! grants go on every analysis schema, volume grants on the volumes schema.

use crate::observability::Timer;
use crate::remote::PermissionChange;

use super::errors::ProvisionResult;
use super::grants::{resolve_grant, PrincipalKind};
use super::orchestrator::{ProvisionOutcome, Provisioner};
use super::payload::{AnalysisRequest, VOLUMES_SUFFIX};

/// Grant lists accumulated across every access-control entry
#[derive(Debug, Default)]
struct AnalysisGrants {
    table: Vec<PermissionChange>,
    volume: Vec<PermissionChange>,
}

impl Provisioner {
    fn collect_analysis_grants(
        &self,
        payload: &AnalysisRequest,
        warnings: &mut Vec<String>,
    ) -> AnalysisGrants {
        let mut grants = AnalysisGrants::default();
        let access = self.access.as_ref();

        for control in payload.access_controls.values() {
            match resolve_grant(access, PrincipalKind::Group, &control.group, &control.table_actions) {
                Ok(change) => grants.table.push(change),
                Err(invalid) => self.skip_invalid(invalid, warnings),
            }
            match resolve_grant(access, PrincipalKind::Group, &control.group, &control.volume_action) {
                Ok(change) => grants.volume.push(change),
                Err(invalid) => self.skip_invalid(invalid, warnings),
            }
        }
        grants
    }

    /// Create the schemas, volume and grants for one analysis
    pub async fn setup_analysis(&self, payload: &AnalysisRequest) -> ProvisionResult<ProvisionOutcome> {
        let timer = Timer::new();
        let catalog = payload.catalog_name();
        let study = payload.business_metadata.study.as_str();
        let analysis_type = payload.business_metadata.analysis_type.as_str();
        let setup = &payload.storage_setup;

        tracing::info!(
            event = "analysis_setup_start",
            catalog = %catalog,
            study,
            analysis_type,
            "Starting analysis setup"
        );

        self.ensure_catalog(&catalog).await?;

        let schemas: Vec<String> = setup
            .data_layer_schemas
            .iter()
            .map(|layer| format!("{}_{}_{}", study, analysis_type, layer))
            .collect();
        for schema in &schemas {
            self.create_schema(schema, &catalog).await?;
        }

        let volume_schema = format!("{}_{}", study, VOLUMES_SUFFIX);
        let volume = format!("{}_vol", analysis_type);
        self.create_volume(&volume, &volume_schema, &catalog).await?;

        for directory in &setup.volume_directories {
            self.create_directory(directory, &volume, &volume_schema, &catalog)
                .await?;
        }

        let mut warnings = Vec::new();
        if !payload.access_controls.is_empty() {
            let grants = self.collect_analysis_grants(payload, &mut warnings);

            for schema in &schemas {
                let full_name = format!("{}.{}", catalog, schema);
                self.grant(&full_name, &grants.table).await?;
            }

            let full_name = format!("{}.{}", catalog, volume_schema);
            self.grant(&full_name, &grants.volume).await?;
        }

        tracing::info!(
            event = "analysis_setup_completed",
            duration_ms = timer.elapsed_ms(),
            warnings = warnings.len(),
            "Completed analysis setup"
        );

        Ok(ProvisionOutcome::success(
            "All resources created successfully",
            warnings,
        ))
    }
}
