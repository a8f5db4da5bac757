//! Deterministic fault injection for exercising client retry logic
//!
//! The simulator answers one request at a time with either a success or a
//! manufactured failure. Failures are fixtures, not errors: a `429` or `500`
//! outcome is the simulator working as intended.
//!
//! ## Modes
//!
//! - `sleep`: suspend the handling task for the requested duration, then succeed
//! - `429`: fail `rate_limit_threshold` times per session, then succeed once
//! - `500`: fail `server_error_threshold` times per session, then succeed once
//! - anything else: succeed immediately
//!
//! Counters are kept per session in an injected [`SessionStore`]. Concurrent
//! requests from one session may interleave their read-modify-write cycles;
//! the harness tolerates that.

mod machine;
mod session;

pub use machine::{Scenario, Verdict, advance};
pub use session::{InMemorySessionStore, SessionStore};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::store;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("duration must be a number of seconds, got '{0}'")]
    InvalidDuration(String),
    #[error("duration must be between 0 and {max} seconds, got {value}")]
    DurationOutOfRange { value: f64, max: f64 },
}

/// What a simulate request asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Sleep(Duration),
    RateLimit,
    ServerError,
    Pass,
}

/// What the simulator decided to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Slept(Duration),
    TooManyRequests { retry_after_secs: u64 },
    ServerError,
}

impl Outcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::TooManyRequests { .. } | Outcome::ServerError)
    }
}

pub struct FaultSimulator {
    sessions: Arc<dyn SessionStore>,
    config: SimulationConfig,
}

impl FaultSimulator {
    pub fn new(sessions: Arc<dyn SessionStore>, config: SimulationConfig) -> Self {
        Self { sessions, config }
    }

    /// Interpret the `status` (or `mode`) and `duration` query values
    pub fn parse_mode(
        &self,
        status: Option<&str>,
        duration: Option<&str>,
    ) -> Result<Mode, SimulationError> {
        let mode = match status.map(str::trim) {
            Some("sleep") => Mode::Sleep(self.parse_duration(duration)?),
            Some("429") => Mode::RateLimit,
            Some("500") => Mode::ServerError,
            _ => Mode::Pass,
        };
        Ok(mode)
    }

    fn parse_duration(&self, raw: Option<&str>) -> Result<Duration, SimulationError> {
        let secs = match raw.map(str::trim) {
            None | Some("") => self.config.default_sleep_secs,
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| SimulationError::InvalidDuration(raw.to_string()))?,
        };

        if !secs.is_finite() || secs < 0.0 || secs > self.config.max_sleep_secs {
            return Err(SimulationError::DurationOutOfRange {
                value: secs,
                max: self.config.max_sleep_secs,
            });
        }

        Ok(Duration::from_secs_f64(secs))
    }

    /// Produce the outcome for one request from `session_id`
    pub async fn run(&self, session_id: &str, mode: Mode) -> store::Result<Outcome> {
        let outcome = match mode {
            Mode::Pass => Outcome::Ok,
            Mode::Sleep(duration) => {
                info!(?duration, "Simulating slow response");
                tokio::time::sleep(duration).await;
                Outcome::Slept(duration)
            }
            Mode::RateLimit => {
                match self
                    .step(session_id, Scenario::RateLimit, self.config.rate_limit_threshold)
                    .await?
                {
                    Verdict::Fail => Outcome::TooManyRequests {
                        retry_after_secs: self.config.retry_after_secs,
                    },
                    Verdict::Pass => Outcome::Ok,
                }
            }
            Mode::ServerError => {
                match self
                    .step(session_id, Scenario::ServerError, self.config.server_error_threshold)
                    .await?
                {
                    Verdict::Fail => Outcome::ServerError,
                    Verdict::Pass => Outcome::Ok,
                }
            }
        };

        Ok(outcome)
    }

    async fn step(&self, session_id: &str, scenario: Scenario, threshold: u32) -> store::Result<Verdict> {
        let counter = self.sessions.load(session_id, scenario).await?;
        let (next, verdict) = advance(counter, threshold);
        self.sessions.save(session_id, scenario, next).await?;

        debug!(session_id, %scenario, counter, next, ?verdict, "Fault counter advanced");
        Ok(verdict)
    }
}
