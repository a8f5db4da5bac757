use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::service::ItemService;
use crate::simulate::{FaultSimulator, SessionStore};
use crate::store::Store;

use super::auth::{Authenticator, BearerTokenAuthenticator};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub items: Arc<ItemService>,
    pub simulator: Arc<FaultSimulator>,
    pub authenticator: Arc<dyn Authenticator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the default collaborators: fault counters in the store's session
    /// partition and bearer-token auth over `config.auth.tokens`.
    pub fn new(config: Config, store: Store) -> Self {
        let store = Arc::new(store);
        let sessions: Arc<dyn SessionStore> = store.clone();
        let authenticator = Arc::new(BearerTokenAuthenticator::new(
            config.auth.tokens.iter().cloned(),
        ));

        Self {
            items: Arc::new(ItemService::new(store.clone())),
            simulator: Arc::new(FaultSimulator::new(sessions, config.simulation.clone())),
            config: Arc::new(config),
            store,
            authenticator,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.simulator = Arc::new(FaultSimulator::new(
            sessions,
            self.config.simulation.clone(),
        ));
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }
}
