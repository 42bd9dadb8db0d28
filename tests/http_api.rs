//! HTTP API Tests
//!
//! The service router in front of a fake workspace API, both bound to
//! loopback, talking through the real reqwest transport:
//! - remote statuses are mirrored as `{error, code}` bodies
//! - every processed request is readable from /get-metadata
//! - malformed bodies are rejected before any remote call

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tower::ServiceExt;

use common::{spawn_server, TOKEN};
use study_provisioner::access::AccessMap;
use study_provisioner::audit::{
    AuditError, AuditRecord, AuditRecorder, AuditResult, AuditStore, MemoryAuditStore,
};
use study_provisioner::http_server::{AppState, HttpServer, HttpServerConfig};
use study_provisioner::observability::MetricsRegistry;
use study_provisioner::provisioning::Provisioner;
use study_provisioner::remote::{ClientConfig, RemoteCallClient, ReqwestTransport, RetryPolicy};

// =============================================================================
// Fake workspace
// =============================================================================

#[derive(Default)]
struct FakeWorkspace {
    catalogs: Vec<String>,
    /// Answer volume creation with 403
    deny_volumes: bool,
    /// `"METHOD path"` per request received
    seen: Mutex<Vec<String>>,
    bearer: Mutex<Option<String>>,
}

impl FakeWorkspace {
    fn with_catalog(name: &str) -> Self {
        Self {
            catalogs: vec![name.to_string()],
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

async fn fake_endpoint(
    State(fake): State<Arc<FakeWorkspace>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    fake.seen.lock().unwrap().push(format!("{} {}", method, path));
    *fake.bearer.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match (method.as_str(), path.as_str()) {
        ("GET", "/api/2.1/unity-catalog/catalogs") => {
            let catalogs: Vec<Value> = fake.catalogs.iter().map(|n| json!({"name": n})).collect();
            (StatusCode::OK, Json(json!({"catalogs": catalogs})))
        }
        ("POST", "/api/2.1/unity-catalog/volumes") if fake.deny_volumes => (
            StatusCode::FORBIDDEN,
            Json(json!({"error_code": "PERMISSION_DENIED"})),
        ),
        ("POST", _) | ("PUT", _) | ("PATCH", _) => (StatusCode::OK, Json(json!({}))),
        _ => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

/// The fake stays up until the returned sender is dropped
async fn spawn_workspace(fake: Arc<FakeWorkspace>) -> (SocketAddr, oneshot::Sender<()>) {
    let app = Router::new().fallback(fake_endpoint).with_state(fake);
    let (addr, shutdown, _handle) = spawn_server(app).await;
    (addr, shutdown)
}

// =============================================================================
// Service under test
// =============================================================================

struct Service {
    router: Router,
    store: Arc<MemoryAuditStore>,
    metrics: Arc<MetricsRegistry>,
}

fn service(remote: SocketAddr) -> Service {
    let store = Arc::new(MemoryAuditStore::new());
    let (router, metrics) = router_over(remote, store.clone());
    Service {
        router,
        store,
        metrics,
    }
}

fn router_over(remote: SocketAddr, store: Arc<dyn AuditStore>) -> (Router, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new());

    let config = ClientConfig::new(format!("http://{}", remote), TOKEN)
        .with_retry(RetryPolicy::new(1, Duration::from_millis(10)));
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let client = RemoteCallClient::with_metrics(config, transport, metrics.clone());
    let provisioner =
        Provisioner::new(client, Arc::new(AccessMap::default())).with_metrics(metrics.clone());
    let recorder = AuditRecorder::new(store, metrics.clone());

    let router = HttpServer::new(
        HttpServerConfig::default(),
        AppState::new(provisioner, recorder, metrics.clone()),
    )
    .router();

    (router, metrics)
}

/// Store whose reads fail
struct UnreadableStore;

#[async_trait]
impl AuditStore for UnreadableStore {
    async fn insert(&self, _record: &AuditRecord) -> AuditResult<()> {
        Ok(())
    }

    async fn query(&self) -> AuditResult<Vec<AuditRecord>> {
        Err(AuditError::Timeout(Duration::from_secs(5)))
    }

    fn kind(&self) -> &'static str {
        "unreadable"
    }
}

fn study_body() -> Value {
    json!({
        "business_metadata": {"product_name": "P", "study": "s1", "study_type": "trial"},
        "storage_setup": {"data_schemas": ["raw", "volumes"]},
        "access_controls": {"raw": {"groups": [{"group": "G1", "access": "read_only"}]}},
        "request_by": "ann@example.com",
        "description": "initial setup"
    })
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

// =============================================================================
// /process over the network
// =============================================================================

/// A study provisioned over real sockets answers 200 and is audited.
#[tokio::test]
async fn test_process_end_to_end() {
    let fake = Arc::new(FakeWorkspace::with_catalog("p"));
    let (remote, _remote_guard) = spawn_workspace(fake.clone()).await;
    let svc = service(remote);
    let (addr, _shutdown, _handle) = spawn_server(svc.router.clone()).await;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("http://{}/process", addr))
        .json(&study_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": "success", "message": "All resources created successfully"})
    );

    assert_eq!(
        fake.seen(),
        vec![
            "GET /api/2.1/unity-catalog/catalogs",
            "POST /api/2.1/unity-catalog/schemas",
            "POST /api/2.1/unity-catalog/schemas",
            "POST /api/2.1/unity-catalog/volumes",
            "PATCH /api/2.1/unity-catalog/permissions/schema/p.s1_raw",
        ]
    );
    assert_eq!(
        fake.bearer.lock().unwrap().as_deref(),
        Some("Bearer dapi-test")
    );

    let metadata: Value = http
        .get(format!("http://{}/get-metadata", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metadata["count"], 1);
    assert_eq!(metadata["data"][0]["http_status_code"], 200);
    assert_eq!(metadata["data"][0]["request_by"], "ann@example.com");
    assert_eq!(metadata["data"][0]["product_name"], "P");
}

/// A remote 403 is mirrored to the caller and recorded with that status.
#[tokio::test]
async fn test_process_mirrors_remote_status() {
    let fake = Arc::new(FakeWorkspace {
        deny_volumes: true,
        ..FakeWorkspace::with_catalog("p")
    });
    let (remote, _remote_guard) = spawn_workspace(fake.clone()).await;
    let svc = service(remote);

    let (status, body) = send(&svc.router, post_json("/process", study_body().to_string())).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
    assert!(body["error"].as_str().unwrap().contains("PERMISSION_DENIED"));
    assert!(!fake
        .seen()
        .iter()
        .any(|call| call.starts_with("PATCH")));

    let records = svc.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].http_status_code, 403);
}

/// A missing catalog answers 404 with the catalog name in the message.
#[tokio::test]
async fn test_process_missing_catalog() {
    let fake = Arc::new(FakeWorkspace::with_catalog("other"));
    let (remote, _remote_guard) = spawn_workspace(fake.clone()).await;
    let svc = service(remote);

    let (status, body) = send(&svc.router, post_json("/process", study_body().to_string())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Catalog p not found", "code": 404}));
    assert_eq!(fake.seen().len(), 1);
    assert_eq!(svc.store.len(), 1);
}

// =============================================================================
// Request validation
// =============================================================================

/// Malformed JSON is rejected up front and never audited.
#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let fake = Arc::new(FakeWorkspace::with_catalog("p"));
    let (remote, _remote_guard) = spawn_workspace(fake.clone()).await;
    let svc = service(remote);

    let (status, body) = send(&svc.router, post_json("/process", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = send(
        &svc.router,
        post_json("/process", json!({"storage_setup": {"data_schemas": []}}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 422);

    assert!(fake.seen().is_empty());
    assert!(svc.store.is_empty());
    assert_eq!(svc.metrics.snapshot().runs_started, 0);
}

// =============================================================================
// Read-only endpoints
// =============================================================================

/// /get-metadata answers 404 until something has been recorded.
#[tokio::test]
async fn test_metadata_empty_is_404() {
    let svc = service("127.0.0.1:9".parse().unwrap());

    let (status, body) = send(&svc.router, get("/get-metadata")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No metadata found", "code": 404}));
}

/// A store read failure answers 500 with the error body.
#[tokio::test]
async fn test_metadata_store_failure_is_500() {
    let (router, _metrics) = router_over("127.0.0.1:9".parse().unwrap(), Arc::new(UnreadableStore));

    let (status, body) = send(&router, get("/get-metadata")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["error"], "audit store timed out after 5s");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let svc = service("127.0.0.1:9".parse().unwrap());

    let (status, body) = send(&svc.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["audit_store"], "memory");

    let (status, body) = send(&svc.router, get("/observability/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs_started"], 0);
    assert_eq!(body["audit_write_failures"], 0);
}
