//! Fixed-point prices with two fractional digits

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest representable price: ten digits, two of them fractional.
pub const MAX_CENTS: u64 = 9_999_999_999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price must not be negative")]
    Negative,

    #[error("price must have at most two decimal places")]
    TooPrecise,

    #[error("price exceeds maximum of 99999999.99")]
    TooLarge,

    #[error("invalid price: {0}")]
    InvalidFormat(String),
}

/// Non-negative decimal price stored as integer cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: u64) -> Result<Self, PriceError> {
        if cents > MAX_CENTS {
            return Err(PriceError::TooLarge);
        }
        Ok(Price(cents))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Interpret a JSON value as a price. Numbers and decimal strings are accepted.
    pub fn from_json(value: &Value) -> Result<Self, PriceError> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => n.to_string().parse(),
            other => Err(PriceError::InvalidFormat(other.to_string())),
        }
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::InvalidFormat(s.to_string()));
        }

        if let Some(rest) = s.strip_prefix('-') {
            // "-0" and "-0.00" are still zero
            return match rest.parse::<Price>() {
                Ok(p) if p.0 == 0 => Ok(Price::ZERO),
                Ok(_) => Err(PriceError::Negative),
                Err(e) => Err(e),
            };
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(PriceError::InvalidFormat(s.to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(PriceError::InvalidFormat(s.to_string()));
        }

        // Trailing zeros beyond the second decimal carry no value
        let frac = frac.trim_end_matches('0');
        if frac.len() > 2 {
            return Err(PriceError::TooPrecise);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > 8 {
            return Err(PriceError::TooLarge);
        }

        let whole_value: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| PriceError::InvalidFormat(s.to_string()))?
        };
        let frac_value: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().unwrap_or(0) * 10,
            _ => frac.parse::<u64>().unwrap_or(0),
        };

        Price::from_cents(whole_value * 100 + frac_value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Price::from_json(&value).map_err(serde::de::Error::custom)
    }
}
