//! Authentication guard for mutating routes
//!
//! The guard is attached with `route_layer` to individual method routers, so
//! it runs after routing and before the handler extracts anything. A rejected
//! request never reaches the item service or the idempotency ledger.

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{error::ApiError, state::AppState};

/// Answers whether a request is authenticated
pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
}

/// Accepts `Authorization: Bearer <token>` for any token in the set
#[derive(Debug, Default)]
pub struct BearerTokenAuthenticator {
    tokens: HashSet<String>,
}

impl BearerTokenAuthenticator {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authenticator for BearerTokenAuthenticator {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .is_some_and(|token| !token.is_empty() && self.tokens.contains(token))
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.authenticator.is_authenticated(request.headers()) {
        state.metrics.unauthorized_rejection();
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected unauthenticated request"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
