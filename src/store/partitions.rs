//! Key layout for the Fjall partitions
//!
//! - `items`: item:{id:020} -> Item (JSON)
//! - `idempotency`: idem:{endpoint}\0{key} -> IdempotencyRecord (JSON)
//! - `sessions`: session:{session_id}\0{counter} -> SessionCounter (JSON)
//! - `metadata`: meta:{key} -> value (decimal string)
//!
//! Item ids are zero padded so lexicographic order matches numeric order.
//! Endpoints and session ids never contain NUL, which makes the separator
//! unambiguous for arbitrary client-supplied idempotency keys.

const SEPARATOR: u8 = 0;

/// Encode an item key: item:{id:020}
pub fn encode_item_key(id: u64) -> Vec<u8> {
    format!("item:{:020}", id).into_bytes()
}

/// Decode an item key: item:{id:020} -> id
pub fn decode_item_key(key: &[u8]) -> Option<u64> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("item:")?.parse().ok()
}

/// Encode an idempotency key scoped to the endpoint it was used on
pub fn encode_idem_key(endpoint: &str, key: &str) -> Vec<u8> {
    let mut encoded = format!("idem:{}", endpoint).into_bytes();
    encoded.push(SEPARATOR);
    encoded.extend_from_slice(key.as_bytes());
    encoded
}

/// Encode a per-session counter key
pub fn encode_session_key(session_id: &str, counter: &str) -> Vec<u8> {
    let mut encoded = format!("session:{}", session_id).into_bytes();
    encoded.push(SEPARATOR);
    encoded.extend_from_slice(counter.as_bytes());
    encoded
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
