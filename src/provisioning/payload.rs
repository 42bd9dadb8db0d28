//! Inbound payloads for the provisioning flows.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::audit::{AuditSubject, BusinessFields};

/// Suffix of the schema that hosts every study volume
pub const VOLUMES_SUFFIX: &str = "volumes";

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ==================
// Study provisioning
// ==================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessMetadata {
    pub product_name: String,
    pub study: String,
    pub study_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSetup {
    pub data_schemas: Vec<String>,
    /// Volume type → directories created inside `vol_{type}`
    #[serde(default)]
    pub volume_directories: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAccess {
    pub group: String,
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccess {
    pub user: String,
    pub access: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAccessControl {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<GroupAccess>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserAccess>,
}

/// Study provisioning request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub business_metadata: BusinessMetadata,
    pub storage_setup: StorageSetup,
    /// Schema key → grants applied on `{catalog}.{study}_{key}`
    #[serde(default)]
    pub access_controls: Option<IndexMap<String, EntityAccessControl>>,
}

impl ProvisioningRequest {
    /// Catalog identifier: the lower-cased product name
    pub fn catalog_name(&self) -> String {
        self.business_metadata.product_name.to_lowercase()
    }

    pub fn study(&self) -> &str {
        &self.business_metadata.study
    }
}

impl AuditSubject for ProvisioningRequest {
    fn business_fields(&self) -> BusinessFields {
        BusinessFields {
            product_name: self.business_metadata.product_name.clone(),
            study: self.business_metadata.study.clone(),
            study_type: Some(self.business_metadata.study_type.clone()),
        }
    }
}

// ==================
// Analysis setup
// ==================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisBusinessMetadata {
    pub product_name: String,
    pub study: String,
    pub analysis_lead: String,
    pub analysis_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStorageSetup {
    /// Directories created inside the analysis volume
    #[serde(default)]
    pub volume_directories: Vec<String>,
    pub data_layer_schemas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAccessControl {
    pub group: String,
    pub table_actions: String,
    pub volume_action: String,
    #[serde(default)]
    pub business_action: Vec<String>,
}

/// Analysis setup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub business_metadata: AnalysisBusinessMetadata,
    pub storage_setup: AnalysisStorageSetup,
    #[serde(default)]
    pub access_controls: IndexMap<String, AnalysisAccessControl>,
}

impl AnalysisRequest {
    pub fn catalog_name(&self) -> String {
        self.business_metadata.product_name.to_lowercase()
    }
}

impl AuditSubject for AnalysisRequest {
    fn business_fields(&self) -> BusinessFields {
        BusinessFields {
            product_name: self.business_metadata.product_name.clone(),
            study: self.business_metadata.study.clone(),
            study_type: Some(self.business_metadata.analysis_type.clone()),
        }
    }
}

// ==================
// Snapshot
// ==================

/// Table snapshot (deep clone as of a timestamp) request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub source_table_fullname: String,
    pub product: String,
    pub study: String,
    pub timestamp: String,
}

impl SnapshotRequest {
    pub fn catalog_name(&self) -> String {
        self.product.to_lowercase()
    }

    /// Last dotted component of the source table name
    pub fn table_name(&self) -> &str {
        self.source_table_fullname
            .rsplit('.')
            .next()
            .unwrap_or(&self.source_table_fullname)
    }
}

impl AuditSubject for SnapshotRequest {
    fn business_fields(&self) -> BusinessFields {
        BusinessFields {
            product_name: self.product.clone(),
            study: self.study.clone(),
            study_type: None,
        }
    }
}
