//! API utility functions
//!
//! Pure, stateless helpers for request processing: header parsing and the
//! session cookie.

use axum::http::{HeaderMap, HeaderName, header};

use crate::api::error::ApiError;

pub const IDEMPOTENCY_KEY_HEADER: HeaderName = HeaderName::from_static("idempotency-key");
pub const SESSION_COOKIE: &str = "itembox_session";

/// Longest accepted `Idempotency-Key`, in characters
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Longest session id accepted from a cookie. Minted ids are 36-char UUIDs.
const MAX_SESSION_ID_LEN: usize = 64;

/// Parses and validates Content-Type header for application/json
///
/// Accepts `application/json` with or without parameters. Rejects
/// `application/jsonp`, `text/json` and malformed media types.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::MalformedRequest(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::MalformedRequest(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// A Content-Type is optional, but when sent it must be JSON
pub fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    match headers.get(header::CONTENT_TYPE) {
        None => Ok(()),
        Some(value) => {
            let value = value.to_str().map_err(|_| {
                ApiError::MalformedRequest("Content-Type is not valid ASCII".into())
            })?;
            parse_content_type(value).map(|_| ())
        }
    }
}

/// The client's idempotency key, if one was sent. Blank keys count as absent.
///
/// Keys longer than [`MAX_IDEMPOTENCY_KEY_LEN`] characters are rejected.
pub fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(key) = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };

    if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(ApiError::Validation(format!(
            "Idempotency-Key must be at most {} characters",
            MAX_IDEMPOTENCY_KEY_LEN
        )));
    }

    Ok(Some(key.to_owned()))
}

/// Extract the session id from any `Cookie` header
///
/// Values that could not have been minted by the server (too long, or with
/// characters outside `[A-Za-z0-9_-]`) are ignored, so the caller starts a
/// fresh session instead.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| is_session_token(value))
        .map(str::to_owned)
}

fn is_session_token(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SESSION_ID_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(session_id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id)
}
