//! # Table Snapshot
//!
//! Deep-clones a source table as of a timestamp into `{study}_snapshot`
//! and waits for the SQL statement to settle.

use tokio::time::Instant;

use crate::observability::{OperationScope, Timer};
use crate::remote::{RemoteError, StatementState};

use super::errors::ProvisionResult;
use super::orchestrator::{ProvisionOutcome, Provisioner};
use super::payload::SnapshotRequest;

impl Provisioner {
    fn warehouse_id(&self) -> ProvisionResult<&str> {
        self.options
            .warehouse_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Request("warehouse id is not configured".into()).into())
    }

    /// Poll until the statement leaves PENDING/RUNNING or the wait cap runs out
    async fn await_statement(
        &self,
        mut state: StatementState,
        target: &str,
    ) -> ProvisionResult<StatementState> {
        let deadline = Instant::now() + self.options.snapshot_max_wait;

        while state.is_pending() {
            if Instant::now() + self.options.snapshot_poll > deadline {
                tracing::error!(
                    event = "snapshot_timeout",
                    statement_id = %state.statement_id,
                    target,
                    "Snapshot did not settle in time"
                );
                return Err(RemoteError::Failed {
                    status: 504,
                    message: format!("Snapshot {} did not complete in time", target),
                }
                .into());
            }
            tokio::time::sleep(self.options.snapshot_poll).await;
            state = self.client.statement_status(&state.statement_id).await?;
            tracing::debug!(
                statement_id = %state.statement_id,
                state = %state.state,
                "snapshot statement polled"
            );
        }
        Ok(state)
    }

    /// Clone `source_table_fullname` into the study snapshot schema
    pub async fn create_snapshot(&self, payload: &SnapshotRequest) -> ProvisionResult<ProvisionOutcome> {
        let timer = Timer::new();
        let catalog = payload.catalog_name();
        let source = payload.source_table_fullname.as_str();
        let warehouse_id = self.warehouse_id()?;

        tracing::info!(
            event = "create_snapshot_start",
            catalog = %catalog,
            study = %payload.study,
            source,
            "Starting table snapshot"
        );

        self.ensure_catalog(&catalog).await?;

        let table = OperationScope::begin("get_table")
            .field("full_name", source)
            .observe(self.client.get_table(source))
            .await?;
        if table.is_none() {
            return Err(RemoteError::NotFound(format!("Table {} not found", source)).into());
        }

        let schema = format!("{}_snapshot", payload.study);
        self.create_schema(&schema, &catalog).await?;

        let target = format!("{}.{}.{}", catalog, schema, payload.table_name());
        let statement = format!(
            "CREATE TABLE {} DEEP CLONE {} TIMESTAMP AS OF '{}'",
            target, source, payload.timestamp
        );

        let started = OperationScope::begin("execute_statement")
            .field("target", &target)
            .observe(self.client.execute_statement(warehouse_id, &statement))
            .await?;
        tracing::info!(
            event = "snapshot_started",
            statement_id = %started.statement_id,
            state = %started.state,
            "Snapshot job started"
        );

        let settled = self.await_statement(started, &target).await?;
        if !settled.succeeded() {
            return Err(RemoteError::Failed {
                status: 500,
                message: format!("Snapshot {} failed to complete", target),
            }
            .into());
        }

        tracing::info!(
            event = "create_snapshot_completed",
            duration_ms = timer.elapsed_ms(),
            target = %target,
            "Completed table snapshot"
        );

        Ok(ProvisionOutcome::success(
            format!("Snapshot {} created successfully", target),
            Vec::new(),
        ))
    }
}
