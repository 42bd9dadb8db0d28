//! OperationScope for timed ok/fail logging of a single step
//!
//! - Logs `begin` at DEBUG on creation
//! - Logs `ok` with `duration_ms` when completed
//! - Logs `fail` with `duration_ms` and the error when failed
//! - Warns on drop if neither happened

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

/// A timed scope around one remote step
///
/// # Usage
///
/// ```ignore
/// OperationScope::begin("create_schema")
///     .field("schema", &schema_name)
///     .field("catalog", &catalog)
///     .observe(client.create_schema(&schema_name, &catalog))
///     .await?;
/// ```
pub struct OperationScope {
    event: &'static str,
    fields: Vec<(&'static str, String)>,
    start: Instant,
    completed: bool,
}

impl OperationScope {
    pub fn begin(event: &'static str) -> Self {
        tracing::debug!(event, "begin");
        Self {
            event,
            fields: Vec::new(),
            start: Instant::now(),
            completed: false,
        }
    }

    /// Attach a context field
    pub fn field(mut self, key: &'static str, value: impl Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn event(&self) -> &'static str {
        self.event
    }

    fn context(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Log `ok` and return the elapsed milliseconds
    pub fn complete(mut self) -> u64 {
        self.completed = true;
        let duration_ms = self.elapsed_ms();
        tracing::info!(event = self.event, duration_ms, context = %self.context(), "ok");
        duration_ms
    }

    /// Log `fail` and return the elapsed milliseconds
    pub fn fail(mut self, error: &dyn Display) -> u64 {
        self.completed = true;
        let duration_ms = self.elapsed_ms();
        tracing::error!(
            event = self.event,
            duration_ms,
            context = %self.context(),
            error = %error,
            "fail"
        );
        duration_ms
    }

    /// Await `fut`, completing or failing the scope on its result
    pub async fn observe<T, E, F>(self, fut: F) -> Result<T, E>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        match fut.await {
            Ok(value) => {
                self.complete();
                Ok(value)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                event = self.event,
                reason = "scope dropped without completion",
                "incomplete"
            );
        }
    }
}

/// A simple duration timer
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
