//! # Workspace Operations
//!
//! Fixed-shape wrappers over [`RemoteCallClient::call`], one endpoint
//! template each.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::client::RemoteCallClient;
use super::errors::{RemoteError, RemoteResult};

pub const CATALOGS_ENDPOINT: &str = "/api/2.1/unity-catalog/catalogs";
pub const SCHEMAS_ENDPOINT: &str = "/api/2.1/unity-catalog/schemas";
pub const VOLUMES_ENDPOINT: &str = "/api/2.1/unity-catalog/volumes";
pub const DIRECTORIES_ENDPOINT: &str = "/api/2.0/fs/directories/Volumes";
pub const PERMISSIONS_ENDPOINT: &str = "/api/2.1/unity-catalog/permissions";
pub const TABLES_ENDPOINT: &str = "/api/2.1/unity-catalog/tables";
pub const STATEMENTS_ENDPOINT: &str = "/api/2.0/sql/statements";

/// One catalog entry; only the name drives orchestration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogList {
    #[serde(default)]
    pub catalogs: Vec<CatalogInfo>,
}

impl CatalogList {
    pub fn contains(&self, name: &str) -> bool {
        self.catalogs.iter().any(|c| c.name == name)
    }
}

/// A single grant change: permissions added for one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
    pub add: Vec<String>,
    pub principal: String,
}

/// SQL statement execution state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementState {
    pub statement_id: String,
    pub state: String,
}

impl StatementState {
    pub fn is_pending(&self) -> bool {
        matches!(self.state.as_str(), "PENDING" | "RUNNING")
    }

    pub fn succeeded(&self) -> bool {
        self.state == "SUCCEEDED"
    }

    fn from_value(value: &Value, endpoint: &str) -> RemoteResult<Self> {
        let state = value
            .pointer("/status/state")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::InvalidBody {
                endpoint: endpoint.to_string(),
                reason: "missing status.state".into(),
            })?;
        let statement_id = value
            .get("statement_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(Self {
            statement_id: statement_id.to_string(),
            state: state.to_string(),
        })
    }
}

fn decode<T: for<'de> Deserialize<'de>>(endpoint: &str, value: Value) -> RemoteResult<T> {
    serde_json::from_value(value).map_err(|e| RemoteError::InvalidBody {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

impl RemoteCallClient {
    pub async fn list_catalogs(&self) -> RemoteResult<CatalogList> {
        let value = self.call(Method::GET, CATALOGS_ENDPOINT, None).await?;
        decode(CATALOGS_ENDPOINT, value)
    }

    pub async fn create_schema(&self, schema_name: &str, catalog_name: &str) -> RemoteResult<Value> {
        let body = json!({ "name": schema_name, "catalog_name": catalog_name });
        self.call(Method::POST, SCHEMAS_ENDPOINT, Some(body)).await
    }

    pub async fn create_volume(
        &self,
        volume_name: &str,
        schema_name: &str,
        catalog_name: &str,
    ) -> RemoteResult<Value> {
        let body = json!({
            "name": volume_name,
            "schema_name": schema_name,
            "catalog_name": catalog_name,
            "volume_type": "MANAGED",
        });
        self.call(Method::POST, VOLUMES_ENDPOINT, Some(body)).await
    }

    pub async fn create_directory(
        &self,
        directory_name: &str,
        volume_name: &str,
        schema_name: &str,
        catalog_name: &str,
    ) -> RemoteResult<Value> {
        let endpoint = format!(
            "{}/{}/{}/{}/{}",
            DIRECTORIES_ENDPOINT, catalog_name, schema_name, volume_name, directory_name
        );
        self.call(Method::PUT, &endpoint, None).await
    }

    pub async fn grant_permissions(
        &self,
        object_type: &str,
        full_name: &str,
        changes: &[PermissionChange],
    ) -> RemoteResult<Value> {
        let endpoint = format!("{}/{}/{}", PERMISSIONS_ENDPOINT, object_type, full_name);
        let body = json!({ "changes": changes });
        self.call(Method::PATCH, &endpoint, Some(body)).await
    }

    /// Table metadata, or `None` when the table does not exist
    pub async fn get_table(&self, full_name: &str) -> RemoteResult<Option<Value>> {
        let endpoint = format!("{}/{}", TABLES_ENDPOINT, full_name);
        match self.call(Method::GET, &endpoint, None).await {
            Ok(value) if value.is_null() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(RemoteError::Client { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn execute_statement(
        &self,
        warehouse_id: &str,
        statement: &str,
    ) -> RemoteResult<StatementState> {
        let body = json!({
            "warehouse_id": warehouse_id,
            "statement": statement,
            "wait_timeout": "0s",
        });
        let value = self
            .call(Method::POST, STATEMENTS_ENDPOINT, Some(body))
            .await?;
        StatementState::from_value(&value, STATEMENTS_ENDPOINT)
    }

    pub async fn statement_status(&self, statement_id: &str) -> RemoteResult<StatementState> {
        let endpoint = format!("{}/{}", STATEMENTS_ENDPOINT, statement_id);
        let value = self.call(Method::GET, &endpoint, None).await?;
        let mut state = StatementState::from_value(&value, &endpoint)?;
        if state.statement_id.is_empty() {
            state.statement_id = statement_id.to_string();
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::remote::mock::{MockReply, MockTransport};
    use crate::remote::ClientConfig;

    fn client(transport: Arc<MockTransport>) -> RemoteCallClient {
        RemoteCallClient::new(ClientConfig::new("https://h", "t"), transport)
    }

    #[tokio::test]
    async fn test_directory_endpoint_template() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::PUT, DIRECTORIES_ENDPOINT, MockReply::ok());

        client(transport.clone())
            .create_directory("landing", "vol_raw", "s1_volumes", "p")
            .await
            .unwrap();

        assert_eq!(
            transport.calls()[0].endpoint,
            "/api/2.0/fs/directories/Volumes/p/s1_volumes/vol_raw/landing"
        );
    }

    #[tokio::test]
    async fn test_volume_body_is_managed() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::POST, VOLUMES_ENDPOINT, MockReply::json(200, json!({})));

        client(transport.clone())
            .create_volume("vol_raw", "s1_volumes", "p")
            .await
            .unwrap();

        assert_eq!(
            transport.calls()[0].body,
            Some(json!({
                "name": "vol_raw",
                "schema_name": "s1_volumes",
                "catalog_name": "p",
                "volume_type": "MANAGED",
            }))
        );
    }

    #[tokio::test]
    async fn test_grant_body_wraps_changes() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::PATCH, PERMISSIONS_ENDPOINT, MockReply::json(200, json!({})));

        let changes = vec![PermissionChange {
            add: vec!["MANAGE".into()],
            principal: "admins".into(),
        }];
        client(transport.clone())
            .grant_permissions("schema", "p.s1_raw", &changes)
            .await
            .unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.endpoint, "/api/2.1/unity-catalog/permissions/schema/p.s1_raw");
        assert_eq!(
            call.body,
            Some(json!({"changes": [{"add": ["MANAGE"], "principal": "admins"}]}))
        );
    }

    #[tokio::test]
    async fn test_list_catalogs_tolerates_missing_key() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::GET, CATALOGS_ENDPOINT, MockReply::json(200, json!({})));

        let catalogs = client(transport).list_catalogs().await.unwrap();
        assert!(catalogs.catalogs.is_empty());
        assert!(!catalogs.contains("p"));
    }

    #[tokio::test]
    async fn test_get_table_maps_404_to_none() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::GET, TABLES_ENDPOINT, MockReply::status(404, "missing"));

        let table = client(transport).get_table("a.b.c").await.unwrap();
        assert!(table.is_none());
    }

    #[test]
    fn test_statement_state_parsing() {
        let state = StatementState::from_value(
            &json!({"statement_id": "st-1", "status": {"state": "RUNNING"}}),
            STATEMENTS_ENDPOINT,
        )
        .unwrap();
        assert!(state.is_pending());
        assert!(!state.succeeded());

        let err = StatementState::from_value(&json!({}), STATEMENTS_ENDPOINT).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidBody { .. }));
    }
}
