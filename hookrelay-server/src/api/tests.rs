use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use hookrelay_core::config::ConfigStore;
use hookrelay_core::framework::SubscriptionRegistry;
use hookrelay_core::processors::{Dispatcher, LogFailureNotifier};
use hookrelay_core::transport::{DeliveryRequest, DeliveryTransport, TransportError};
use hookrelay_sdk::signature::{ADMIN_AUTH_HEADER, OWNER_ID_HEADER};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tower::ServiceExt;

use crate::config::runtime::{AdminConfig, DeliveryConfig};
use crate::server::build_router;
use crate::state::AppState;

const ADMIN_SECRET: &str = "admin-secret";

#[derive(Default)]
struct CountingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl DeliveryTransport for CountingTransport {
    async fn send(&self, _request: DeliveryRequest) -> Result<u16, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(200)
    }
}

fn hash(secret: &str) -> String {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn app() -> (Router, Arc<CountingTransport>) {
    let transport = Arc::new(CountingTransport::default());
    let (dispatcher, worker) = Dispatcher::new(
        SubscriptionRegistry::new(),
        transport.clone(),
        Arc::new(LogFailureNotifier),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(worker.run(shutdown_rx));

    let state = AppState::new(
        dispatcher,
        ConfigStore::new(DeliveryConfig::default()),
        AdminConfig::new(hash(ADMIN_SECRET)),
    );
    (build_router(state), transport)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn as_owner(method: &str, uri: &str, owner: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(OWNER_ID_HEADER, owner);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create_webhook(router: &Router, owner: &str, body: Value) -> Value {
    let (status, created) = send(router, as_owner("POST", "/api/v1/webhooks", owner, Some(body))).await;
    assert_eq!(status, StatusCode::CREATED);
    created
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_event_catalog() {
    let (router, _) = app();
    let request = Request::builder().uri("/api/v1/events").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 18);
    assert!(events.contains(&json!("webhook.test")));
    assert!(events.contains(&json!("subscription.canceled")));
}

#[tokio::test]
async fn test_create_returns_secret_once() {
    let (router, _) = app();
    let created = create_webhook(
        &router,
        "alice",
        json!({"url": "https://example.test/hook", "events": ["project.*"]}),
    )
    .await;
    assert_eq!(created["events"], json!(["project.*"]));
    assert_eq!(created["active"], true);
    assert_eq!(created["max_attempts"], 3);
    assert_eq!(created["timeout_secs"], 30);
    assert_eq!(created["secret"].as_str().unwrap().len(), 64);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) =
        send(&router, as_owner("GET", &format!("/api/v1/webhooks/{id}"), "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched.get("secret").is_none());

    let (_, listed) = send(&router, as_owner("GET", "/api/v1/webhooks", "alice", None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0].get("secret").is_none());
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (router, _) = app();
    let (status, body) = send(
        &router,
        as_owner("POST", "/api/v1/webhooks", "alice", Some(json!({"url": "ftp://nope"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("url"));

    let (status, _) = send(
        &router,
        as_owner(
            "POST",
            "/api/v1/webhooks",
            "alice",
            Some(json!({"url": "https://example.test/hook", "max_attempts": 0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_header_required() {
    let (router, _) = app();
    let request = Request::builder()
        .uri("/api/v1/webhooks")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_owner_cannot_see_or_modify() {
    let (router, _) = app();
    let created =
        create_webhook(&router, "alice", json!({"url": "https://example.test/hook"})).await;
    let uri = format!("/api/v1/webhooks/{}", created["id"].as_str().unwrap());

    let (_, listed) = send(&router, as_owner("GET", "/api/v1/webhooks", "bob", None)).await;
    assert_eq!(listed, json!([]));

    for (method, body) in [
        ("GET", None),
        ("PATCH", Some(json!({"active": false}))),
        ("DELETE", None),
    ] {
        let (status, _) = send(&router, as_owner(method, &uri, "bob", body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
    }
    let (status, _) = send(&router, as_owner("GET", &format!("{uri}/stats"), "bob", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = send(&router, as_owner("GET", &uri, "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["active"], true);
}

#[tokio::test]
async fn test_update_and_delete() {
    let (router, _) = app();
    let created =
        create_webhook(&router, "alice", json!({"url": "https://example.test/hook"})).await;
    let uri = format!("/api/v1/webhooks/{}", created["id"].as_str().unwrap());

    let (status, updated) = send(
        &router,
        as_owner(
            "PATCH",
            &uri,
            "alice",
            Some(json!({"events": ["user.created"], "timeout_secs": 5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["events"], json!(["user.created"]));
    assert_eq!(updated["timeout_secs"], 5);
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, _) = send(&router, as_owner("DELETE", &uri, "alice", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, as_owner("GET", &uri, "alice", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_requires_admin() {
    let (router, _) = app();
    create_webhook(
        &router,
        "alice",
        json!({"url": "https://example.test/hook", "events": ["project.created"]}),
    )
    .await;
    let trigger = json!({"event": "project.created", "data": {"name": "demo"}});

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/internal/trigger")
        .header("content-type", "application/json")
        .body(Body::from(trigger.to_string()))
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/internal/trigger")
        .header("content-type", "application/json")
        .header(ADMIN_AUTH_HEADER, "wrong")
        .body(Body::from(trigger.to_string()))
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/internal/trigger")
        .header("content-type", "application/json")
        .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
        .body(Body::from(trigger.to_string()))
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["enqueued"], 1);
}

#[tokio::test]
async fn test_trigger_rejects_empty_event() {
    let (router, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/internal/trigger")
        .header("content-type", "application/json")
        .header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
        .body(Body::from(json!({"event": ""}).to_string()))
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_test_delivery_then_stats() {
    let (router, transport) = app();
    let created = create_webhook(
        &router,
        "alice",
        json!({"url": "https://example.test/hook", "events": ["payment.*"]}),
    )
    .await;
    let uri = format!("/api/v1/webhooks/{}", created["id"].as_str().unwrap());

    let (status, outcome) =
        send(&router, as_owner("POST", &format!("{uri}/test"), "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["http_status"], 200);
    assert_eq!(outcome["attempt"], 1);
    assert!(outcome["error"].is_null());

    let (status, outcome) = send(
        &router,
        as_owner(
            "POST",
            &format!("{uri}/replay"),
            "alice",
            Some(json!({"event": "payment.failed", "data": {"amount": 3}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["success"], true);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);

    let (status, stats) =
        send(&router, as_owner("GET", &format!("{uri}/stats"), "alice", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["success_count"], 2);
    assert_eq!(stats["failure_count"], 0);
    assert_eq!(stats["success_rate"], 100.0);
    assert!(stats["last_triggered_at"].is_string());
    assert_eq!(stats["url"], "https://example.test/hook");
}

#[tokio::test]
async fn test_update_rejects_blank_secret() {
    let (router, _) = app();
    let created = create_webhook(
        &router,
        "alice",
        json!({"url": "https://example.test/hook", "secret": "whsec_original"}),
    )
    .await;
    assert_eq!(created["secret"], "whsec_original");
    let uri = format!("/api/v1/webhooks/{}", created["id"].as_str().unwrap());

    let (status, body) = send(
        &router,
        as_owner("PATCH", &uri, "alice", Some(json!({"secret": ""}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("secret"));
}
