use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Simulation threshold must be at least 1: {field} = {value}")]
    InvalidThreshold { field: String, value: u32 },

    #[error("Sleep duration must be finite and non-negative: {field} = {value}")]
    InvalidSleep { field: String, value: f64 },

    #[error("default_sleep_secs ({default}) exceeds max_sleep_secs ({max})")]
    DefaultSleepExceedsMax { default: f64, max: f64 },

    #[error("max_body_bytes must be positive")]
    InvalidMaxBodyBytes,

    #[error("Retention TTL must be positive: {field} = {value}")]
    InvalidRetentionTTL { field: String, value: u32 },

    #[error("API tokens must not be empty")]
    EmptyToken,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_auth(config)?;
    validate_simulation(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_body_bytes == 0 {
        return Err(ValidationError::InvalidMaxBodyBytes);
    }
    Ok(())
}

fn validate_auth(config: &Config) -> Result<(), ValidationError> {
    if config.auth.tokens.iter().any(|token| token.trim().is_empty()) {
        return Err(ValidationError::EmptyToken);
    }
    Ok(())
}

/// Thresholds drive the fault cycles; sleeps feed `Duration::from_secs_f64`
fn validate_simulation(config: &Config) -> Result<(), ValidationError> {
    let sim = &config.simulation;

    for (field, value) in [
        ("rate_limit_threshold", sim.rate_limit_threshold),
        ("server_error_threshold", sim.server_error_threshold),
    ] {
        if value == 0 {
            return Err(ValidationError::InvalidThreshold {
                field: field.to_string(),
                value,
            });
        }
    }

    for (field, value) in [
        ("default_sleep_secs", sim.default_sleep_secs),
        ("max_sleep_secs", sim.max_sleep_secs),
        ("health_sleep_secs", sim.health_sleep_secs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidSleep {
                field: field.to_string(),
                value,
            });
        }
    }

    if sim.default_sleep_secs > sim.max_sleep_secs {
        return Err(ValidationError::DefaultSleepExceedsMax {
            default: sim.default_sleep_secs,
            max: sim.max_sleep_secs,
        });
    }

    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.retention.idempotency_ttl_days == 0 {
        return Err(ValidationError::InvalidRetentionTTL {
            field: "idempotency_ttl_days".to_string(),
            value: 0,
        });
    }
    if config.retention.session_ttl_hours == 0 {
        return Err(ValidationError::InvalidRetentionTTL {
            field: "session_ttl_hours".to_string(),
            value: 0,
        });
    }
    Ok(())
}
