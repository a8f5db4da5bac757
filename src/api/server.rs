use axum::{
    Router,
    body::Body,
    http::Request,
    middleware,
    routing::{get, post, put},
};
use chrono::TimeDelta;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    decompression::RequestDecompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span};

use super::{
    auth::require_auth,
    services::{
        create_item, delete_item, get_item, health, list_items, method_not_allowed, not_found,
        simulate, update_item,
    },
    state::AppState,
};
use crate::config::Config;
use crate::store::Store;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the HTTP routing table
///
/// Mutating routes carry the auth guard as a route layer; reads are open.
/// Every response, including fallbacks and 405s, gets an `X-Request-Id`.
pub fn router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), require_auth);

    Router::new()
        .route("/health", get(health))
        .route("/items/simulate", get(simulate))
        .route(
            "/items",
            get(list_items).merge(post(create_item).route_layer(guard.clone())),
        )
        .route(
            "/items/{id}",
            get(get_item).merge(put(update_item).delete(delete_item).route_layer(guard)),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                // Handles Content-Encoding before handlers see the body
                .layer(RequestDecompressionLayer::new()),
        )
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;

    let store = Store::open(&config.server.data_path)
        .map_err(|e| format!("Failed to open store: {}", e))?;

    let retention = &config.retention;
    store.prune_idempotency(TimeDelta::days(i64::from(retention.idempotency_ttl_days)))?;
    store.prune_sessions(TimeDelta::hours(i64::from(retention.session_ttl_hours)))?;

    let state = AppState::new(config, store);
    let store = state.store.clone();
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "ItemBox API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.persist()?;
    info!("Store flushed, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
