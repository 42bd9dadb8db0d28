//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::Router;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use study_provisioner::access::AccessMap;
use study_provisioner::audit::{AuditRecorder, MemoryAuditStore};
use study_provisioner::observability::MetricsRegistry;
use study_provisioner::provisioning::{ProvisionOptions, Provisioner, ProvisioningRequest};
use study_provisioner::remote::mock::{MockReply, MockTransport};
use study_provisioner::remote::{
    ClientConfig, RemoteCallClient, RetryPolicy, CATALOGS_ENDPOINT, DIRECTORIES_ENDPOINT,
    PERMISSIONS_ENDPOINT, SCHEMAS_ENDPOINT, VOLUMES_ENDPOINT,
};

pub const HOST: &str = "https://adb-123.example.net";
pub const TOKEN: &str = "dapi-test";
pub const ACCOUNT_ID: &str = "acc-1";

// =============================================================================
// Remote fixtures
// =============================================================================

pub fn client_config() -> ClientConfig {
    ClientConfig::new(HOST, TOKEN)
        .with_account_id(ACCOUNT_ID)
        .with_retry(RetryPolicy::new(3, Duration::from_secs(2)))
}

pub fn client_with(transport: Arc<MockTransport>, metrics: Arc<MetricsRegistry>) -> RemoteCallClient {
    RemoteCallClient::with_metrics(client_config(), transport, metrics)
}

/// A provisioner over `transport` with the default access map
pub fn provisioner(transport: Arc<MockTransport>) -> Provisioner {
    provisioner_with(transport, ProvisionOptions::default())
}

pub fn provisioner_with(transport: Arc<MockTransport>, options: ProvisionOptions) -> Provisioner {
    let metrics = Arc::new(MetricsRegistry::new());
    Provisioner::new(
        client_with(transport, metrics.clone()),
        Arc::new(AccessMap::default()),
    )
    .with_options(options)
    .with_metrics(metrics)
}

pub fn recorder(store: Arc<MemoryAuditStore>) -> (AuditRecorder, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new());
    (AuditRecorder::new(store, metrics.clone()), metrics)
}

/// Catalog listing that contains exactly `names`
pub fn catalogs(names: &[&str]) -> MockReply {
    let catalogs: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    MockReply::json(200, json!({ "catalogs": catalogs }))
}

/// Every workspace endpoint answers 200; catalogs lists `catalog`
pub fn happy_workspace(catalog: &str) -> Arc<MockTransport> {
    let transport = Arc::new(MockTransport::new());
    transport.on(Method::GET, CATALOGS_ENDPOINT, catalogs(&[catalog]));
    transport.on(Method::POST, SCHEMAS_ENDPOINT, MockReply::json(200, json!({})));
    transport.on(Method::POST, VOLUMES_ENDPOINT, MockReply::json(200, json!({})));
    transport.on(Method::PUT, DIRECTORIES_ENDPOINT, MockReply::ok());
    transport.on(Method::PATCH, PERMISSIONS_ENDPOINT, MockReply::json(200, json!({})));
    transport
}

pub fn study_payload(value: Value) -> ProvisioningRequest {
    serde_json::from_value(value).expect("payload should deserialize")
}

/// `"METHOD endpoint"` for every recorded call, in order
pub fn call_log(transport: &MockTransport) -> Vec<String> {
    transport
        .calls()
        .iter()
        .map(|c| format!("{} {}", c.method, c.endpoint))
        .collect()
}

// =============================================================================
// Log capture
// =============================================================================

#[derive(Clone)]
struct TestWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for TestWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install a capturing subscriber once per test binary
pub fn init_test_tracing() -> Arc<Mutex<Vec<u8>>> {
    static LOG_BUF: OnceLock<Arc<Mutex<Vec<u8>>>> = OnceLock::new();

    LOG_BUF
        .get_or_init(|| {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let make_writer = {
                let buf = buf.clone();
                move || TestWriter { buf: buf.clone() }
            };

            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .with_ansi(false)
                .with_writer(make_writer)
                .finish();

            tracing::subscriber::set_global_default(subscriber)
                .expect("global tracing subscriber should be set once");

            buf
        })
        .clone()
}

pub fn captured_logs(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&buf.lock().unwrap_or_else(|e| e.into_inner())).into_owned()
}

// =============================================================================
// In-process servers
// =============================================================================

pub async fn spawn_server(app: Router) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local_addr should succeed");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    (addr, shutdown_tx, handle)
}
