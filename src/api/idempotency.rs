//! Keyed execution of mutating requests
//!
//! A request carrying an `Idempotency-Key` runs at most once per endpoint.
//! Lookup, mutation and record all happen inside one [`WriteScope`]: the
//! scope's writer lock serializes concurrent duplicates, and its batch commits
//! the mutation together with the recorded response.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::error::ApiError;
use crate::observability::Metrics;
use crate::store::{Store, StoredResponse, WriteScope};

/// Run `mutate` for `key` on `endpoint`, or replay the response recorded for it.
///
/// Failures from `mutate` are returned as-is and leave no trace in the store.
pub fn execute_idempotent<F>(
    store: &Store,
    metrics: &Metrics,
    key: &str,
    endpoint: &str,
    mutate: F,
) -> Result<Response, ApiError>
where
    F: FnOnce(&mut WriteScope<'_>) -> Result<StoredResponse, ApiError>,
{
    let mut scope = store.write();

    if let Some(stored) = scope.lookup_response(key, endpoint)? {
        metrics.idempotent_replay();
        info!(key, endpoint, status = stored.status, "Replaying recorded response");
        return Ok(replay(stored));
    }

    let response = mutate(&mut scope)?;
    scope.record_response(key, endpoint, &response)?;
    scope.commit()?;

    debug!(key, endpoint, status = response.status, "Recorded response");
    Ok(replay(response))
}

/// Render a stored response exactly as recorded
pub fn replay(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    (
        status,
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        stored.body,
    )
        .into_response()
}
