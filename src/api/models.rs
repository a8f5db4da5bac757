//! Wire models for the ItemBox HTTP API
//!
//! Items are exchanged as:
//!
//! ```json
//! { "id": 1, "name": "Widget", "price": "9.99" }
//! ```
//!
//! Create and update accept `name` (required) and `price` (optional, number
//! or decimal string). Errors are always `{"error": "...", "code": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::service::ItemInput;

/// Body of `POST /items` and `PUT /items/{id}`
#[derive(Debug, Default, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
}

impl From<ItemPayload> for ItemInput {
    fn from(payload: ItemPayload) -> Self {
        ItemInput {
            name: payload.name,
            price: payload.price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SimulateQuery {
    #[serde(default, alias = "mode")]
    pub status: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    #[serde(default)]
    pub sleep: Option<String>,
}

impl HealthQuery {
    /// `?sleep`, `?sleep=1`, `?sleep=true` and friends all enable the delay
    pub fn wants_sleep(&self) -> bool {
        match self.sleep.as_deref().map(str::trim) {
            Some(flag) => matches!(
                flag.to_ascii_lowercase().as_str(),
                "" | "1" | "true" | "yes" | "on"
            ),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_payload_allows_missing_fields() {
        let payload: ItemPayload = serde_json::from_value(json!({})).unwrap();
        assert!(payload.name.is_none());
        assert!(payload.price.is_none());
    }

    #[test]
    fn item_payload_keeps_price_raw() {
        let payload: ItemPayload =
            serde_json::from_value(json!({"name": "a", "price": 1.5})).unwrap();
        assert_eq!(payload.price, Some(json!(1.5)));
    }

    #[test]
    fn item_payload_rejects_non_string_name() {
        assert!(serde_json::from_value::<ItemPayload>(json!({"name": 5})).is_err());
    }

    #[test]
    fn health_query_flag_parsing() {
        let q = |v: Option<&str>| HealthQuery { sleep: v.map(str::to_string) };
        assert!(!q(None).wants_sleep());
        assert!(q(Some("")).wants_sleep());
        assert!(q(Some("TRUE")).wants_sleep());
        assert!(q(Some("1")).wants_sleep());
        assert!(!q(Some("false")).wants_sleep());
        assert!(!q(Some("0")).wants_sleep());
    }
}
