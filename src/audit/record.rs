//! Audit record model
//!
//! One record per inbound request, written once at completion and never
//! updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::AuditResult;

/// Business identifiers copied from the request payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessFields {
    pub product_name: String,
    pub study: String,
    pub study_type: Option<String>,
}

/// A payload that can be audited
pub trait AuditSubject: Serialize {
    fn business_fields(&self) -> BusinessFields;
}

/// Optional caller-supplied context, flattened into the inbound body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_justification: Option<String>,
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub request_payload: Value,
    pub response_payload: Value,
    /// Status returned to the caller
    pub http_status_code: i32,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
    pub product_name: String,
    pub study: String,
    pub study_type: Option<String>,
    pub request_by: Option<String>,
    pub description: Option<String>,
    pub business_justification: Option<String>,
    pub api_response_time_ms: Option<i64>,
}

impl AuditRecord {
    /// Build a record for `subject`, deriving the business fields from it
    pub fn new<S: AuditSubject + ?Sized>(
        subject: &S,
        response: Value,
        http_status_code: i32,
    ) -> AuditResult<Self> {
        let fields = subject.business_fields();
        Ok(Self {
            id: Uuid::new_v4(),
            request_payload: serde_json::to_value(subject)?,
            response_payload: response,
            http_status_code,
            error_message: None,
            duration_ms: 0,
            created_at: Utc::now(),
            product_name: fields.product_name,
            study: fields.study,
            study_type: fields.study_type,
            request_by: None,
            description: None,
            business_justification: None,
            api_response_time_ms: None,
        })
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = i64::try_from(duration_ms).unwrap_or(i64::MAX);
        self
    }

    pub fn with_metadata(mut self, meta: &RequestMetadata) -> Self {
        self.request_by = meta.request_by.clone();
        self.description = meta.description.clone();
        self.business_justification = meta.business_justification.clone();
        self
    }

    pub fn with_api_response_time_ms(mut self, ms: Option<u64>) -> Self {
        self.api_response_time_ms = ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));
        self
    }

    /// Serialize to one JSON line (for append-only logs).
    pub fn to_json_line(&self) -> AuditResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Subject {
        product: &'static str,
    }

    impl AuditSubject for Subject {
        fn business_fields(&self) -> BusinessFields {
            BusinessFields {
                product_name: self.product.to_string(),
                study: "s1".to_string(),
                study_type: Some("trial".to_string()),
            }
        }
    }

    #[test]
    fn test_record_derives_business_fields() {
        let record = AuditRecord::new(&Subject { product: "P" }, json!({"status": "success"}), 200)
            .unwrap()
            .with_duration_ms(42)
            .with_metadata(&RequestMetadata {
                request_by: Some("ann@example.com".into()),
                ..Default::default()
            });

        assert_eq!(record.product_name, "P");
        assert_eq!(record.study, "s1");
        assert_eq!(record.study_type.as_deref(), Some("trial"));
        assert_eq!(record.request_payload, json!({"product": "P"}));
        assert_eq!(record.duration_ms, 42);
        assert_eq!(record.request_by.as_deref(), Some("ann@example.com"));
        assert!(record.description.is_none());
    }

    #[test]
    fn test_record_json_line() {
        let record = AuditRecord::new(&Subject { product: "P" }, json!({}), 404)
            .unwrap()
            .with_error("Catalog p not found");

        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let parsed: AuditRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
