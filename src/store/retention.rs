//! Retention policy for idempotency records and idle simulation sessions

use chrono::{TimeDelta, Utc};
use tracing::info;

use super::engine::Store;
use super::error::Result;
use super::models::{IdempotencyRecord, SessionCounter};

/// Default number of days an idempotency record is kept
pub const RETENTION_IDEMPOTENCY_DAYS: u32 = 14;

/// Default number of hours a session counter survives without being advanced
pub const RETENTION_SESSION_HOURS: u32 = 24;

#[derive(Debug, Default)]
pub struct PruneStats {
    pub idempotency_pruned: usize,
    pub idempotency_kept: usize,
    pub sessions_pruned: usize,
    pub sessions_kept: usize,
}

impl Store {
    /// Remove idempotency records created more than `ttl` ago
    ///
    /// A client retrying with a pruned key executes the mutation again, so the
    /// TTL must comfortably exceed any client's retry horizon.
    pub fn prune_idempotency(&self, ttl: TimeDelta) -> Result<PruneStats> {
        let cutoff = Utc::now() - ttl;
        let partition = self.idempotency_partition();
        let mut stats = PruneStats::default();

        // Serialize with writers so a record staged concurrently is never half-seen
        let _scope = self.write();
        let mut expired = Vec::new();
        for entry in partition.iter() {
            let (key, value) = entry?;
            let record: IdempotencyRecord = serde_json::from_slice(&value)?;
            if record.created_at < cutoff {
                expired.push(key);
            } else {
                stats.idempotency_kept += 1;
            }
        }

        let mut batch = self.keyspace().batch();
        for key in expired {
            batch.remove(partition, key);
            stats.idempotency_pruned += 1;
        }
        batch.commit()?;

        info!(
            pruned = stats.idempotency_pruned,
            kept = stats.idempotency_kept,
            "Pruned idempotency records"
        );
        Ok(stats)
    }

    /// Remove session counters not advanced within `ttl`
    ///
    /// A pruned session simply starts its fault cycle again.
    pub fn prune_sessions(&self, ttl: TimeDelta) -> Result<PruneStats> {
        let cutoff = Utc::now() - ttl;
        let partition = self.sessions_partition();
        let mut stats = PruneStats::default();

        let mut expired = Vec::new();
        for entry in partition.iter() {
            let (key, value) = entry?;
            match serde_json::from_slice::<SessionCounter>(&value) {
                Ok(counter) if counter.touched_at >= cutoff => stats.sessions_kept += 1,
                // Unreadable counters are dropped along with stale ones
                _ => expired.push(key),
            }
        }

        let mut batch = self.keyspace().batch();
        for key in expired {
            batch.remove(partition, key);
            stats.sessions_pruned += 1;
        }
        batch.commit()?;

        info!(
            pruned = stats.sessions_pruned,
            kept = stats.sessions_kept,
            "Pruned idle simulation sessions"
        );
        Ok(stats)
    }
}
