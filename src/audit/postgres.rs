//! Postgres audit store (table `metadata`).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::Row;

use super::errors::{AuditError, AuditResult};
use super::record::AuditRecord;
use super::store::AuditStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS metadata (
    id UUID PRIMARY KEY,
    request_payload JSONB NOT NULL,
    response_payload JSONB NOT NULL,
    http_status_code INTEGER NOT NULL,
    error_message TEXT,
    execution_duration_ms BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    product_name TEXT NOT NULL,
    study TEXT NOT NULL,
    study_type TEXT,
    request_by TEXT,
    description TEXT,
    business_justification TEXT,
    api_response_time_ms BIGINT
)";

const INSERT: &str = "INSERT INTO metadata (
    id, request_payload, response_payload, http_status_code, error_message,
    execution_duration_ms, created_at, product_name, study, study_type,
    request_by, description, business_justification, api_response_time_ms
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)";

const SELECT_ALL: &str = "SELECT id, request_payload, response_payload, http_status_code,
    error_message, execution_duration_ms, created_at, product_name, study, study_type,
    request_by, description, business_justification, api_response_time_ms
FROM metadata ORDER BY created_at";

/// Connection settings for the audit database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgAuditConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub write_timeout: Duration,
}

impl PgAuditConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(PgSslMode::Require)
    }
}

impl Default for PgAuditConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5432,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct PgAuditStore {
    pool: sqlx::PgPool,
    write_timeout: Duration,
}

impl PgAuditStore {
    /// Connect and create the `metadata` table if it is missing
    pub async fn connect(config: &PgAuditConfig) -> AuditResult<Self> {
        let pool = tokio::time::timeout(
            CONNECT_TIMEOUT,
            PgPoolOptions::new()
                .max_connections(8)
                .connect_with(config.connect_options()),
        )
        .await
        .map_err(|_| AuditError::Timeout(CONNECT_TIMEOUT))??;

        let store = Self {
            pool,
            write_timeout: config.write_timeout,
        };
        store.ensure_table().await?;
        tracing::info!(host = %config.host, database = %config.database, "audit database ready");
        Ok(store)
    }

    async fn ensure_table(&self) -> AuditResult<()> {
        tokio::time::timeout(
            self.write_timeout,
            sqlx::query(CREATE_TABLE).execute(&self.pool),
        )
        .await
        .map_err(|_| AuditError::Timeout(self.write_timeout))??;
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> Result<AuditRecord, sqlx::Error> {
    Ok(AuditRecord {
        id: row.try_get("id")?,
        request_payload: row.try_get("request_payload")?,
        response_payload: row.try_get("response_payload")?,
        http_status_code: row.try_get("http_status_code")?,
        error_message: row.try_get("error_message")?,
        duration_ms: row.try_get("execution_duration_ms")?,
        created_at: row.try_get("created_at")?,
        product_name: row.try_get("product_name")?,
        study: row.try_get("study")?,
        study_type: row.try_get("study_type")?,
        request_by: row.try_get("request_by")?,
        description: row.try_get("description")?,
        business_justification: row.try_get("business_justification")?,
        api_response_time_ms: row.try_get("api_response_time_ms")?,
    })
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
        tokio::time::timeout(
            self.write_timeout,
            sqlx::query(INSERT)
                .bind(record.id)
                .bind(&record.request_payload)
                .bind(&record.response_payload)
                .bind(record.http_status_code)
                .bind(&record.error_message)
                .bind(record.duration_ms)
                .bind(record.created_at)
                .bind(&record.product_name)
                .bind(&record.study)
                .bind(&record.study_type)
                .bind(&record.request_by)
                .bind(&record.description)
                .bind(&record.business_justification)
                .bind(record.api_response_time_ms)
                .execute(&self.pool),
        )
        .await
        .map_err(|_| AuditError::Timeout(self.write_timeout))??;
        Ok(())
    }

    async fn query(&self) -> AuditResult<Vec<AuditRecord>> {
        let rows = tokio::time::timeout(
            self.write_timeout,
            sqlx::query(SELECT_ALL).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| AuditError::Timeout(self.write_timeout))??;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
