use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use itembox::api::{AppState, router};
use itembox::client::{ClientConfig, ClientError, ItemClient};
use itembox::config::Config;
use itembox::price::Price;
use itembox::store::Store;

const TOKEN: &str = "client-token";

/// Serves `app` on an ephemeral local port and returns its base URL
async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

async fn spawn_server() -> (String, AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.server.data_path = temp_dir.path().join("itembox");
    config.auth.tokens = vec![TOKEN.to_string()];

    let store = Store::open(&config.server.data_path).expect("Failed to open test store");
    let state = AppState::new(config, store);
    let url = serve(router(state.clone())).await;
    (url, state, temp_dir)
}

/// Fast retry timings so tests don't wait on real backoff
fn client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        api_token: Some(TOKEN.to_string()),
        request_timeout: Duration::from_secs(5),
        max_retries: 3,
        base_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        degraded_cooldown: Duration::from_millis(300),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_client_crud_roundtrip() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(client_config(&url)).unwrap();

    let created = client
        .create_item("Widget", Some(Price::from_cents(999).unwrap()))
        .await
        .unwrap();
    assert_eq!(created.name, "Widget");
    assert_eq!(created.price.cents(), 999);

    assert_eq!(client.get_item(created.id).await.unwrap(), created);

    let updated = client.update_item(created.id, "Gadget", None).await.unwrap();
    assert_eq!(updated.name, "Gadget");
    assert_eq!(updated.price, created.price);

    assert_eq!(client.list_items().await.unwrap(), vec![updated]);

    client.delete_item(created.id).await.unwrap();
    let err = client.get_item(created.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_client_reports_validation_errors_without_retry() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(client_config(&url)).unwrap();

    let err = client.create_item("  ", None).await.unwrap_err();

    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_client_without_token_is_unauthorized() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(ClientConfig {
        api_token: None,
        ..client_config(&url)
    })
    .unwrap();

    let err = client.create_item("Widget", None).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    assert!(client.list_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_client_recovers_from_server_errors() {
    let (url, state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(client_config(&url)).unwrap();

    let response = client.simulate("500", None).await.unwrap();

    assert_eq!(response.status, "ok");
    assert_eq!(state.metrics.snapshot().faults_injected, 2);
}

#[tokio::test]
async fn test_client_gives_up_after_max_retries() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(ClientConfig {
        max_retries: 1,
        ..client_config(&url)
    })
    .unwrap();

    let err = client.simulate("500", None).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::ServerError {
            status: 500,
            attempts: 2
        }
    ));
    assert!(!client.is_degraded());
}

#[tokio::test]
async fn test_client_recovers_from_rate_limit() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(client_config(&url)).unwrap();

    // Retry-After of 5s is capped by max_backoff
    let started = std::time::Instant::now();
    client.simulate("429", None).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!client.is_degraded());
}

#[tokio::test]
async fn test_client_enters_degraded_mode() {
    let (url, _state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(ClientConfig {
        max_retries: 0,
        ..client_config(&url)
    })
    .unwrap();

    let err = client.simulate("429", None).await.unwrap_err();
    assert!(matches!(err, ClientError::RateLimited { attempts: 1 }));
    assert!(client.is_degraded());

    // Everything but health is blocked while degraded
    assert!(matches!(client.list_items().await, Err(ClientError::Degraded)));
    assert_eq!(client.health().await.unwrap().status, "ok");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!client.is_degraded());
    assert!(client.list_items().await.is_ok());
}

#[tokio::test]
async fn test_client_timeout_is_not_retried() {
    let (url, state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(ClientConfig {
        request_timeout: Duration::from_millis(100),
        ..client_config(&url)
    })
    .unwrap();

    let started = std::time::Instant::now();
    let err = client.simulate("sleep", Some(0.5)).await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(state.metrics.snapshot().faults_injected, 0);
}

#[tokio::test]
async fn test_client_transport_errors_are_retried_then_reported() {
    // Reserve a port, then free it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = ItemClient::new(ClientConfig {
        max_retries: 1,
        ..client_config(&format!("http://{address}"))
    })
    .unwrap();

    let err = client.list_items().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_client_same_key_creates_once() {
    let (url, state, _temp_dir) = spawn_server().await;
    let client = ItemClient::new(client_config(&url)).unwrap();

    let first = client.create_item_with_key("order-1", "Widget", None).await.unwrap();
    let second = client.create_item_with_key("order-1", "Widget", None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.list_items().await.unwrap().len(), 1);
    assert_eq!(state.metrics.snapshot().idempotent_replays, 1);
}

#[derive(Clone, Default)]
struct KeyRecorder {
    keys: Arc<Mutex<Vec<Option<String>>>>,
}

/// Fails the first two creates with 500, then succeeds
async fn flaky_create(State(recorder): State<KeyRecorder>, headers: HeaderMap) -> Response {
    let key = headers
        .get("idempotency-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let attempt = {
        let mut keys = recorder.keys.lock().unwrap();
        keys.push(key);
        keys.len()
    };

    if attempt < 3 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": 1, "name": "Widget", "price": "0.00"})),
    )
        .into_response()
}

#[tokio::test]
async fn test_client_reuses_idempotency_key_across_retries() {
    let recorder = KeyRecorder::default();
    let app = Router::new()
        .route("/items", post(flaky_create))
        .with_state(recorder.clone());
    let url = serve(app).await;

    let client = ItemClient::new(client_config(&url)).unwrap();
    let item = client.create_item("Widget", None).await.unwrap();
    assert_eq!(item.id, 1);

    let keys = recorder.keys.lock().unwrap().clone();
    assert_eq!(keys.len(), 3);
    assert!(keys[0].is_some());
    assert!(keys.iter().all(|key| key == &keys[0]));

    // A second call gets a fresh key
    recorder.keys.lock().unwrap().clear();
    client.create_item("Widget", None).await.unwrap();
    let next = recorder.keys.lock().unwrap()[0].clone();
    assert_ne!(next, keys[0]);
}
