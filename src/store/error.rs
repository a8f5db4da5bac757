use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Idempotency key '{key}' already recorded for {endpoint}")]
    Conflict { key: String, endpoint: String },

    #[error("Corrupt value under key {0}")]
    Corrupt(String),

    #[error("Item id space exhausted")]
    IdExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
