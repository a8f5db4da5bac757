//! Counter state machine behind the fault scenarios
//!
//! Each (session, scenario) pair owns a counter in `0..=threshold`. A request
//! below the threshold fails and bumps the counter; a request at the threshold
//! succeeds and resets it. The cycle length is therefore `threshold + 1`.

use std::fmt;

/// A fault scenario with its own per-session counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    RateLimit,
    ServerError,
}

impl Scenario {
    /// Name of the counter this scenario advances
    pub fn counter_key(&self) -> &'static str {
        match self {
            Scenario::RateLimit => "429-count",
            Scenario::ServerError => "500-count",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.counter_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fail,
    Pass,
}

/// Pure transition: `(counter, threshold) -> (counter', verdict)`
pub fn advance(counter: u32, threshold: u32) -> (u32, Verdict) {
    if counter < threshold {
        (counter + 1, Verdict::Fail)
    } else {
        (0, Verdict::Pass)
    }
}
