//! # Remote Call Client
//!
//! Builds and issues calls against the workspace API with bounded retries.
//!
//! - `[400,500)` is terminal and propagated with its body
//! - `[500,600)` and network faults are retried with exponential backoff
//! - anything else is terminal
//!
//! Each attempt is folded into an [`AttemptResult`]; the loop inspects that
//! instead of unwinding through errors.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use crate::observability::MetricsRegistry;

use super::errors::{RemoteError, RemoteResult};
use super::retry::RetryPolicy;
use super::transport::{RawResponse, RemoteRequest, Transport, TransportError};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one workspace
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub token: String,
    /// Needed only by the account (SCIM) operations
    pub account_id: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            account_id: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// What one attempt amounted to
#[derive(Debug)]
pub enum AttemptResult {
    Success(RawResponse),
    Retryable { status: Option<u16>, reason: String },
    Terminal(RemoteError),
}

impl AttemptResult {
    /// Classify the raw result of one exchange
    pub fn classify(result: Result<RawResponse, TransportError>) -> Self {
        match result {
            Ok(response) => match response.status {
                200..=299 => AttemptResult::Success(response),
                400..=499 => AttemptResult::Terminal(RemoteError::Client {
                    status: response.status,
                    body: response.body,
                }),
                500..=599 => AttemptResult::Retryable {
                    status: Some(response.status),
                    reason: format!("server error {}: {}", response.status, response.body),
                },
                status => AttemptResult::Terminal(RemoteError::UnexpectedStatus {
                    status,
                    body: response.body,
                }),
            },
            Err(err) if err.is_retryable() => AttemptResult::Retryable {
                status: None,
                reason: err.to_string(),
            },
            Err(err) => AttemptResult::Terminal(RemoteError::Request(err.to_string())),
        }
    }
}

/// Summary of one `call`, emitted once it settles
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub method_and_endpoint: String,
    pub http_status: Option<u16>,
    pub detail: String,
    pub attempts: u32,
}

impl CallOutcome {
    fn log(&self, ok: bool) {
        let status = self.http_status.map(i32::from).unwrap_or(-1);
        if ok {
            tracing::info!(
                event = "remote_call",
                call = %self.method_and_endpoint,
                status,
                attempts = self.attempts,
                body = %self.detail,
                "remote call succeeded"
            );
        } else {
            tracing::error!(
                event = "remote_call",
                call = %self.method_and_endpoint,
                status,
                attempts = self.attempts,
                error = %self.detail,
                "remote call failed"
            );
        }
    }
}

/// Client for the workspace API
#[derive(Clone)]
pub struct RemoteCallClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    metrics: Arc<MetricsRegistry>,
}

impl RemoteCallClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_metrics(config, transport, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            metrics,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Join the configured host with a relative endpoint
    pub fn url_for(&self, endpoint: &str) -> String {
        let host = self.config.host.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{}{}", host, endpoint)
        } else {
            format!("{}/{}", host, endpoint)
        }
    }

    fn build_request(&self, method: Method, endpoint: &str, body: Option<Value>) -> RemoteRequest {
        RemoteRequest {
            url: self.url_for(endpoint),
            endpoint: endpoint.to_string(),
            method,
            bearer_token: self.config.token.clone(),
            body,
            timeout: self.config.timeout,
        }
    }

    /// Issue one call with retries and return its parsed JSON body.
    ///
    /// An empty body yields `{"status":"success"}`.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> RemoteResult<Value> {
        let request = self.build_request(method, endpoint, body);
        let retry = self.config.retry;
        let label = format!("{} {}", request.method, endpoint);

        let mut last_status: Option<u16> = None;
        let mut last_reason = String::new();

        for attempt in 0..retry.retries {
            tracing::debug!(
                method = %request.method,
                endpoint,
                attempt = attempt + 1,
                "calling remote API"
            );
            self.metrics.increment_remote_calls();

            match AttemptResult::classify(self.transport.send(&request).await) {
                AttemptResult::Success(response) => {
                    let parsed = parse_body(endpoint, &response.body);
                    CallOutcome {
                        method_and_endpoint: label,
                        http_status: Some(response.status),
                        detail: response.body,
                        attempts: attempt + 1,
                    }
                    .log(parsed.is_ok());
                    return parsed;
                }
                AttemptResult::Terminal(err) => {
                    CallOutcome {
                        method_and_endpoint: label,
                        http_status: u16::try_from(err.status_code()).ok(),
                        detail: err.to_string(),
                        attempts: attempt + 1,
                    }
                    .log(false);
                    return Err(err);
                }
                AttemptResult::Retryable { status, reason } => {
                    if status.is_some() {
                        last_status = status;
                    }
                    last_reason = reason;

                    if retry.has_next(attempt) {
                        let delay = retry.delay_for(attempt);
                        tracing::warn!(
                            endpoint,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            reason = %last_reason,
                            "retryable remote failure, backing off"
                        );
                        self.metrics.increment_remote_retries();
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let err = RemoteError::Exhausted {
            last_status,
            attempts: retry.retries,
            reason: last_reason,
        };
        CallOutcome {
            method_and_endpoint: label,
            http_status: last_status,
            detail: err.to_string(),
            attempts: retry.retries,
        }
        .log(false);
        Err(err)
    }
}

fn parse_body(endpoint: &str, body: &str) -> RemoteResult<Value> {
    if body.trim().is_empty() {
        return Ok(json!({ "status": "success" }));
    }
    serde_json::from_str(body).map_err(|e| RemoteError::InvalidBody {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
