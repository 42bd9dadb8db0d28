//! In-memory transport for tests and dry runs.
//!
//! Routes match on method and endpoint prefix, first registered wins. Each
//! route replays its replies in order and repeats the last one once the
//! queue is down to a single entry. Unmatched calls answer 404.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::transport::{RawResponse, RemoteRequest, Transport, TransportError};

/// A scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(RawResponse),
    Fail(TransportError),
}

impl MockReply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Response(RawResponse::new(status, body))
    }

    pub fn json(status: u16, body: Value) -> Self {
        MockReply::Response(RawResponse::new(status, body.to_string()))
    }

    pub fn ok() -> Self {
        Self::status(200, "")
    }

    pub fn timeout() -> Self {
        MockReply::Fail(TransportError::Timeout("simulated timeout".into()))
    }

    pub fn connection_refused() -> Self {
        MockReply::Fail(TransportError::Connect("simulated connection refused".into()))
    }
}

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub url: String,
    pub bearer_token: String,
    pub body: Option<Value>,
    pub at: tokio::time::Instant,
}

struct MockRoute {
    method: Method,
    prefix: String,
    replies: VecDeque<MockReply>,
}

/// Scripted [`Transport`]
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<MockRoute>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method` on endpoints starting with `prefix`
    pub fn on(&self, method: Method, prefix: &str, reply: MockReply) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.prefix == prefix)
        {
            route.replies.push_back(reply);
            return;
        }
        routes.push(MockRoute {
            method,
            prefix: prefix.to_string(),
            replies: VecDeque::from([reply]),
        });
    }

    /// Queue several replies in order
    pub fn on_sequence(&self, method: Method, prefix: &str, replies: impl IntoIterator<Item = MockReply>) {
        for reply in replies {
            self.on(method.clone(), prefix, reply);
        }
    }

    /// Every request seen so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Requests whose endpoint starts with `prefix`
    pub fn calls_to(&self, method: Method, prefix: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.endpoint.starts_with(prefix))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn next_reply(&self, method: &Method, endpoint: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let route = routes
            .iter_mut()
            .find(|r| &r.method == method && endpoint.starts_with(&r.prefix))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RawResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                method: request.method.clone(),
                endpoint: request.endpoint.clone(),
                url: request.url.clone(),
                bearer_token: request.bearer_token.clone(),
                body: request.body.clone(),
                at: tokio::time::Instant::now(),
            });

        match self.next_reply(&request.method, &request.endpoint) {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Fail(err)) => Err(err),
            None => Ok(RawResponse::new(
                404,
                format!("no mock route for {} {}", request.method, request.endpoint),
            )),
        }
    }
}
