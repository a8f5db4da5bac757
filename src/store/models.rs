use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::price::Price;

/// A persisted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price: Price,
}

/// Validated fields for a new item; the id is assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub price: Price,
}

/// A response captured for replay: status code plus the exact body bytes sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub body: String,
}

impl StoredResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            status,
            body: serde_json::to_string(value)?,
        })
    }
}

/// Ledger entry for one (idempotency key, endpoint) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub idempotency_key: String,
    pub endpoint: String,
    pub response_status: u16,
    pub response_data: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn response(&self) -> StoredResponse {
        StoredResponse {
            status: self.response_status,
            body: self.response_data.clone(),
        }
    }
}

/// A per-session fault counter and when it was last advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounter {
    pub value: u32,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub touched_at: DateTime<Utc>,
}
