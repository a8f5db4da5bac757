use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::machine::Scenario;
use crate::store::{Result, Store};

/// Storage for per-session fault counters
///
/// Unknown sessions read as zero, so state is created lazily on the first save
/// and saving zero may forget the session entirely.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str, scenario: Scenario) -> Result<u32>;

    async fn save(&self, session_id: &str, scenario: Scenario, counter: u32) -> Result<()>;
}

/// Process-local session store used by tests and ephemeral setups
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    counters: Mutex<HashMap<(String, Scenario), u32>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str, scenario: Scenario) -> Result<u32> {
        let counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(counters
            .get(&(session_id.to_string(), scenario))
            .copied()
            .unwrap_or(0))
    }

    async fn save(&self, session_id: &str, scenario: Scenario, counter: u32) -> Result<()> {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (session_id.to_string(), scenario);
        if counter == 0 {
            counters.remove(&key);
        } else {
            counters.insert(key, counter);
        }
        Ok(())
    }
}

/// Counters persisted in the `sessions` partition, surviving restarts
#[async_trait]
impl SessionStore for Store {
    async fn load(&self, session_id: &str, scenario: Scenario) -> Result<u32> {
        self.session_counter(session_id, scenario.counter_key())
    }

    async fn save(&self, session_id: &str, scenario: Scenario, counter: u32) -> Result<()> {
        self.set_session_counter(session_id, scenario.counter_key(), counter)
    }
}
