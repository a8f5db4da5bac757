use serde_json::Value;
use thiserror::Error;

use crate::price::{Price, PriceError};

pub const MAX_NAME_CHARS: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field 'name' is required")]
    MissingName,
    #[error("Field 'name' must not exceed {} characters", MAX_NAME_CHARS)]
    NameTooLong,
    #[error("Field 'price' is invalid: {0}")]
    InvalidPrice(#[from] PriceError),
}

/// Returns the trimmed name, or an error when it is absent, blank or too long
pub fn validate_name(name: Option<&str>) -> Result<String, ValidationError> {
    let name = name.map(str::trim).unwrap_or_default();

    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong);
    }

    Ok(name.to_string())
}

/// Parses an optional price. JSON `null` is treated like an omitted field.
pub fn validate_price(price: Option<&Value>) -> Result<Option<Price>, ValidationError> {
    match price {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(Price::from_json(value)?)),
    }
}
