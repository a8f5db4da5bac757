use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::{RETENTION_IDEMPOTENCY_DAYS, RETENTION_SESSION_HOURS};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Fjall keyspace directory
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_path: default_data_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/itembox")
}

fn default_max_body_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Accepted bearer tokens (loaded from environment, never from the config file)
    #[serde(skip)]
    pub tokens: Vec<String>,
}

/// Fault simulation knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Failed requests per 429 cycle before one success
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u32,
    /// Failed requests per 500 cycle before one success
    #[serde(default = "default_server_error_threshold")]
    pub server_error_threshold: u32,
    /// Value of the `Retry-After` header on simulated 429s
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
    #[serde(default = "default_sleep_secs")]
    pub default_sleep_secs: f64,
    #[serde(default = "default_max_sleep_secs")]
    pub max_sleep_secs: f64,
    /// Delay applied by `GET /health?sleep=true`
    #[serde(default = "default_sleep_secs")]
    pub health_sleep_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_limit_threshold: default_rate_limit_threshold(),
            server_error_threshold: default_server_error_threshold(),
            retry_after_secs: default_retry_after_secs(),
            default_sleep_secs: default_sleep_secs(),
            max_sleep_secs: default_max_sleep_secs(),
            health_sleep_secs: default_sleep_secs(),
        }
    }
}

fn default_rate_limit_threshold() -> u32 {
    1
}

fn default_server_error_threshold() -> u32 {
    2
}

fn default_retry_after_secs() -> u64 {
    5
}

fn default_sleep_secs() -> f64 {
    2.0
}

fn default_max_sleep_secs() -> f64 {
    30.0
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_idempotency_ttl_days")]
    pub idempotency_ttl_days: u32,
    /// Idle time after which a simulation session's counters are dropped
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl_days: default_idempotency_ttl_days(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_idempotency_ttl_days() -> u32 {
    RETENTION_IDEMPOTENCY_DAYS
}

fn default_session_ttl_hours() -> u32 {
    RETENTION_SESSION_HOURS
}
