//! HTTP adapter over the real service stack and the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use roster_server::health::{Dependency, HealthService, Readiness};
use roster_server::network::{AppState, NetworkConfig, NetworkModule};
use roster_server::notify::ChannelNotifier;
use roster_server::repository::MemoryUserRepository;
use roster_server::service::{build_operation_pipeline, ServiceConfig, UserClient, UserService};
use roster_server::store::MemoryStore;
use roster_server::LogReporter;
use serde_json::{json, Value};
use tower::ServiceExt;

struct App {
    store: Arc<MemoryStore>,
    repo: Arc<MemoryUserRepository>,
    router: Router,
}

fn app() -> App {
    let store = Arc::new(MemoryStore::new());
    let repo = Arc::new(MemoryUserRepository::new(
        Arc::clone(&store),
        Duration::from_secs(60),
    ));
    let notifier = Arc::new(ChannelNotifier::new("roster_user_updated"));

    let config = ServiceConfig {
        metrics_enabled: false,
        ..ServiceConfig::default()
    };
    let core = Arc::new(UserService::new(repo.clone(), notifier.clone(), config.clone()));
    let pipeline = build_operation_pipeline(core, &config, Arc::new(LogReporter::new("test")));

    let deps: Vec<Arc<dyn Readiness>> = vec![
        Arc::new(Dependency::repository(repo.clone())),
        Arc::new(Dependency::notifier(notifier)),
    ];
    let state = AppState {
        client: UserClient::new(pipeline, config.default_operation_timeout_ms),
        health: Arc::new(HealthService::new(deps)),
    };

    let router = NetworkModule::new(NetworkConfig::default(), state).build_router();
    App {
        store,
        repo,
        router,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn crud_round_over_http() {
    let app = app();

    let (status, created) = send(
        &app.router,
        Method::POST,
        "/user",
        Some(json!({
            "nickname": "alice",
            "email": "alice@example.com",
            "password": "p",
            "passwordConfirm": "p"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        Method::PUT,
        &format!("/user/{id}"),
        Some(json!({ "nickname": "alice2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);

    let (status, users) = send(&app.router, Method::GET, "/user?nickname=alice2", None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], id.as_str());
    assert_eq!(users[0]["email"], "alice@example.com");
    assert!(users[0].get("password").is_none());

    let (status, _) = send(&app.router, Method::DELETE, &format!("/user/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = app();

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/user",
        Some(json!({ "nickname": "x", "password": "a", "passwordConfirm": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad request: passwords do not match");

    let (status, body) = send(&app.router, Method::DELETE, "/user/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");

    let (status, _) = send(&app.router, Method::GET, "/user?password=x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, Method::GET, "/user?limit=501", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.store.set_failing(true);
    let (status, body) = send(&app.router, Method::GET, "/user", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service unavailable");
}

#[tokio::test]
async fn readiness_endpoint_tracks_probe() {
    let app = app();

    let (status, _) = send(&app.router, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    app.store.set_reachable(false);
    app.repo.readiness().check_now().await;

    let (status, body) = send(&app.router, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "dependency repository is not ready");

    let (status, _) = send(&app.router, Method::GET, "/health/live", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, Method::GET, "/health/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
