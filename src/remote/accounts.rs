//! Account-level group management (SCIM).

use reqwest::Method;
use serde_json::{json, Value};

use super::client::RemoteCallClient;
use super::errors::{RemoteError, RemoteResult};

impl RemoteCallClient {
    fn groups_endpoint(&self) -> RemoteResult<String> {
        let account_id = self
            .config()
            .account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Request("account id is not configured".into()))?;
        Ok(format!("/api/2.0/accounts/{}/scim/v2/Groups", account_id))
    }

    /// Groups whose display name equals `name`
    pub async fn list_groups(&self, name: &str) -> RemoteResult<Vec<Value>> {
        let endpoint = format!(
            "{}?filter=displayName eq '{}'",
            self.groups_endpoint()?,
            filter_literal(name)
        );
        let value = self.call(Method::GET, &endpoint, None).await?;
        Ok(value
            .get("Resources")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn create_group(&self, name: &str) -> RemoteResult<Value> {
        let endpoint = self.groups_endpoint()?;
        self.call(Method::POST, &endpoint, Some(json!({ "displayName": name })))
            .await
    }

    /// Return the existing group named `name`, creating it when absent
    pub async fn ensure_group_exists(&self, name: &str) -> RemoteResult<Value> {
        if let Some(existing) = self.list_groups(name).await?.into_iter().next() {
            tracing::debug!(group = name, "group already exists");
            return Ok(existing);
        }
        tracing::info!(group = name, "creating missing group");
        self.create_group(name).await
    }
}

/// Quote a value for a SCIM filter string literal
fn filter_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
