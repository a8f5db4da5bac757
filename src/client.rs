//! Retrying HTTP client for the ItemBox API
//!
//! Handles the failure modes the fault simulator produces:
//!
//! - `429`: waits for `Retry-After` (capped) or the backoff, and after the last
//!   retry switches the client into degraded mode for `degraded_cooldown`
//! - `500`, `502`, `503`, `504` and transport errors: exponential backoff
//! - timeouts: reported immediately as [`ClientError::Timeout`]
//!
//! While degraded, every call except [`ItemClient::health`] fails fast.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::models::StatusResponse;
use crate::price::Price;
use crate::store::Item;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("client is in degraded mode, request blocked")]
    Degraded,

    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("server error {status} after {attempts} attempts")]
    ServerError { status: u16, attempts: u32 },

    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub degraded_cooldown: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_token: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            degraded_cooldown: Duration::from_secs(10),
            user_agent: concat!("itembox-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

pub struct ItemClient {
    http: Client,
    config: ClientConfig,
    degraded_until: Mutex<Option<Instant>>,
}

impl ItemClient {
    /// Create a new client. The cookie store keeps the simulator session.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            config,
            degraded_until: Mutex::new(None),
        })
    }

    /// GET /health. Allowed in degraded mode.
    pub async fn health(&self) -> Result<StatusResponse> {
        let response = self.execute(false, || self.request(Method::GET, "/health")).await?;
        decode(response).await
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let response = self.execute(true, || self.request(Method::GET, "/items")).await?;
        decode(response).await
    }

    pub async fn get_item(&self, id: u64) -> Result<Item> {
        let path = format!("/items/{id}");
        let response = self.execute(true, || self.request(Method::GET, &path)).await?;
        decode(response).await
    }

    /// Create an item under a fresh idempotency key
    pub async fn create_item(&self, name: &str, price: Option<Price>) -> Result<Item> {
        let key = Uuid::new_v4().to_string();
        self.create_item_with_key(&key, name, price).await
    }

    /// Create an item, sending `key` as `Idempotency-Key` on every attempt
    pub async fn create_item_with_key(
        &self,
        key: &str,
        name: &str,
        price: Option<Price>,
    ) -> Result<Item> {
        let body = item_body(name, price);
        let response = self
            .execute(true, || {
                self.request(Method::POST, "/items")
                    .header("Idempotency-Key", key)
                    .json(&body)
            })
            .await?;
        decode(response).await
    }

    pub async fn update_item(&self, id: u64, name: &str, price: Option<Price>) -> Result<Item> {
        let path = format!("/items/{id}");
        let body = item_body(name, price);
        let response = self
            .execute(true, || self.request(Method::PUT, &path).json(&body))
            .await?;
        decode(response).await
    }

    pub async fn delete_item(&self, id: u64) -> Result<()> {
        let path = format!("/items/{id}");
        self.execute(true, || self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    /// GET /items/simulate with the given mode
    pub async fn simulate(&self, status: &str, duration: Option<f64>) -> Result<StatusResponse> {
        let mut query = vec![("status", status.to_string())];
        if let Some(duration) = duration {
            query.push(("duration", duration.to_string()));
        }

        let response = self
            .execute(true, || self.request(Method::GET, "/items/simulate").query(&query))
            .await?;
        decode(response).await
    }

    pub fn is_degraded(&self) -> bool {
        let mut until = self
            .degraded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                info!("Degraded mode cleared");
                false
            }
            None => false,
        }
    }

    fn enter_degraded_mode(&self) {
        let mut until = self
            .degraded_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *until = Some(Instant::now() + self.config.degraded_cooldown);
        warn!(cooldown = ?self.config.degraded_cooldown, "Rate limit persisted, entering degraded mode");
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let builder = self.http.request(method, url);
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send the request built by `build`, retrying per the policy above
    async fn execute<F>(&self, guarded: bool, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        if guarded && self.is_degraded() {
            return Err(ClientError::Degraded);
        }

        let mut attempts = 0;

        loop {
            attempts += 1;
            let exhausted = attempts > self.config.max_retries;

            let response = match build().send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    warn!(attempts, "Request timed out");
                    return Err(ClientError::Timeout);
                }
                Err(e) => {
                    if exhausted {
                        warn!(attempts, error = %e, "Request failed after retries");
                        return Err(ClientError::Transport(e.to_string()));
                    }
                    let delay = self.backoff(attempts);
                    warn!(attempts, error = %e, ?delay, "Request failed, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if exhausted {
                    self.enter_degraded_mode();
                    return Err(ClientError::RateLimited { attempts });
                }
                let delay = retry_after(&response)
                    .map(|wait| wait.min(self.config.max_backoff))
                    .unwrap_or_else(|| self.backoff(attempts));
                warn!(attempts, ?delay, "Rate limited, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            if is_retryable(status) {
                if exhausted {
                    warn!(attempts, status = status.as_u16(), "Server error after retries");
                    return Err(ClientError::ServerError {
                        status: status.as_u16(),
                        attempts,
                    });
                }
                let delay = self.backoff(attempts);
                warn!(attempts, status = status.as_u16(), ?delay, "Server error, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(api_error(response).await);
            }

            if attempts > 1 {
                debug!(attempts, "Request succeeded after retry");
            }
            return Ok(response);
        }
    }

    /// Exponential backoff for the given attempt (1-based), capped at `max_backoff`
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.config
            .base_backoff
            .saturating_mul(factor)
            .min(self.config.max_backoff)
    }
}

fn item_body(name: &str, price: Option<Price>) -> serde_json::Value {
    match price {
        Some(price) => json!({ "name": name, "price": price }),
        None => json!({ "name": name }),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("Unknown")
        .to_string();

    match response.json::<ErrorBody>().await {
        Ok(body) => ClientError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.error,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: None,
            message: fallback,
        },
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Decode(e.to_string())
        }
    })
}
