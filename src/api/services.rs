use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    error::ApiError,
    idempotency::execute_idempotent,
    models::{ErrorResponse, HealthQuery, ItemPayload, SimulateQuery, StatusResponse},
    state::AppState,
    utils::{check_content_type, idempotency_key, session_cookie, session_id},
};
use crate::service::ItemService;
use crate::simulate::Outcome;
use crate::store::StoredResponse;

/// Endpoint name under which `POST /items` responses are recorded
pub const ITEMS_ENDPOINT: &str = "/items";

/// Health check endpoint (GET /health)
///
/// `?sleep=true` delays the answer by `simulation.health_sleep_secs`, which
/// lets clients exercise their own timeouts against a known-good route.
pub async fn health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    if query.wants_sleep() {
        let delay = Duration::from_secs_f64(state.config.simulation.health_sleep_secs);
        info!(?delay, "Delaying health check");
        tokio::time::sleep(delay).await;
    }

    (StatusCode::OK, Json(StatusResponse::ok()))
}

/// Fault simulation endpoint (GET /items/simulate)
///
/// Counters are tracked per `itembox_session` cookie. A request without one
/// starts a new session and receives the cookie on its response, whatever
/// the outcome.
pub async fn simulate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SimulateQuery>,
) -> Result<Response, ApiError> {
    let mode = state
        .simulator
        .parse_mode(query.status.as_deref(), query.duration.as_deref())?;

    let (session, fresh) = match session_id(&headers) {
        Some(session) => (session, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let outcome = state.simulator.run(&session, mode).await?;
    if outcome.is_fault() {
        state.metrics.fault_injected();
        warn!(session = %session, ?outcome, "Injected simulated fault");
    }

    let mut response = match outcome {
        Outcome::Ok | Outcome::Slept(_) => {
            (StatusCode::OK, Json(StatusResponse::ok())).into_response()
        }
        Outcome::TooManyRequests { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(ErrorResponse {
                error: "Too many requests, retry later".to_string(),
                code: "RATE_LIMITED",
            }),
        )
            .into_response(),
        Outcome::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Simulated server error".to_string(),
                code: "SIMULATED_FAILURE",
            }),
        )
            .into_response(),
    };

    if fresh {
        let cookie = HeaderValue::from_str(&session_cookie(&session))
            .map_err(|err| ApiError::Internal(err.to_string()))?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

/// GET /items
pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.items.list()?;
    Ok((StatusCode::OK, Json(items)))
}

/// GET /items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let item = state.items.get(id)?;
    Ok((StatusCode::OK, Json(item)))
}

/// Item creation endpoint (POST /items)
///
/// ## Flow:
/// 1. Auth guard (route layer) has already admitted the request
/// 2. Validate Content-Type and read the body within `max_body_bytes`
/// 3. With a valid an `Idempotency-Key`: replay the recorded response if present,
///    otherwise create and record in one atomic write
/// 4. Without a key: plain create
///
/// Replays are byte-identical to the first response because both are served
/// from the recorded body.
pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    check_content_type(&headers)?;
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;

    let Some(key) = idempotency_key(&headers)? else {
        let payload: ItemPayload = serde_json::from_slice(&bytes)?;
        let item = state.items.create(payload.into())?;
        state.metrics.item_created();
        return Ok((StatusCode::CREATED, Json(item)).into_response());
    };

    execute_idempotent(&state.store, &state.metrics, &key, ITEMS_ENDPOINT, |scope| {
        let payload: ItemPayload = serde_json::from_slice(&bytes)?;
        let item = ItemService::create_in(scope, payload.into())?;
        state.metrics.item_created();
        StoredResponse::json(StatusCode::CREATED.as_u16(), &item)
            .map_err(|e| ApiError::Internal(format!("Failed to encode item: {}", e)))
    })
}

/// PUT /items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    check_content_type(&headers)?;
    let bytes = read_body(body, state.config.server.max_body_bytes).await?;

    let payload: ItemPayload = serde_json::from_slice(&bytes)?;
    let item = state.items.update(id, payload.into())?;
    Ok((StatusCode::OK, Json(item)))
}

/// DELETE /items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.items.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// JSON 404 for unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route".to_string())
}

/// Ids are plain ASCII digits; anything else cannot name an item
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    let not_found = || ApiError::NotFound(format!("item {raw}"));

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_found());
    }
    raw.parse().map_err(|_| not_found())
}

/// 405 for a known path hit with an unsupported method
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Reads the request body, failing once it grows past `max_bytes`
///
/// Decompression is handled by RequestDecompressionLayer, so the limit
/// applies to the decoded payload.
async fn read_body(body: Body, max_bytes: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, max_bytes).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge(max_bytes))
        }
        Err(err) => Err(ApiError::MalformedRequest(format!(
            "failed to read request body: {}",
            err
        ))),
    }
}
