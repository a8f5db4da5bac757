//! Tracing setup and in-process counters

use std::sync::atomic::{AtomicU64, Ordering};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    items_created: AtomicU64,
    idempotent_replays: AtomicU64,
    faults_injected: AtomicU64,
    unauthorized_rejections: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_created(&self) {
        self.items_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_created", "Metric incremented");
    }

    pub fn idempotent_replay(&self) {
        self.idempotent_replays.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "idempotent_replays", "Metric incremented");
    }

    pub fn fault_injected(&self) {
        self.faults_injected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "faults_injected", "Metric incremented");
    }

    pub fn unauthorized_rejection(&self) {
        self.unauthorized_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "unauthorized_rejections", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_created: self.items_created.load(Ordering::Relaxed),
            idempotent_replays: self.idempotent_replays.load(Ordering::Relaxed),
            faults_injected: self.faults_injected.load(Ordering::Relaxed),
            unauthorized_rejections: self.unauthorized_rejections.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_created: u64,
    pub idempotent_replays: u64,
    pub faults_injected: u64,
    pub unauthorized_rejections: u64,
}
