//! # Transport
//!
//! The wire seam under [`RemoteCallClient`](super::RemoteCallClient). One
//! `send` is one HTTP exchange; retrying and classification live above it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// A fully built request, ready to put on the wire
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    pub method: Method,
    /// Endpoint relative to the host, as passed to `call`
    pub endpoint: String,
    /// Absolute URL
    pub url: String,
    pub bearer_token: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Raw status and body text of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure below the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout(String),
    Connect(String),
    Other(String),
}

impl TransportError {
    /// Timeouts and connection failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout(m) => write!(f, "request timed out: {}", m),
            TransportError::Connect(m) => write!(f, "connection failed: {}", m),
            TransportError::Other(m) => write!(f, "transport error: {}", m),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            TransportError::Timeout(value.to_string())
        } else if value.is_connect() || value.is_request() {
            TransportError::Connect(value.to_string())
        } else {
            TransportError::Other(value.to_string())
        }
    }
}

/// Issues a single HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .bearer_auth(&request.bearer_token)
            .timeout(request.timeout);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
