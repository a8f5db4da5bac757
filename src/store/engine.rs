use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use fjall::{Batch, Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::models::{IdempotencyRecord, Item, NewItem, SessionCounter, StoredResponse};
use super::partitions::{
    decode_item_key, encode_idem_key, encode_item_key, encode_meta_key, encode_session_key,
};

const META_NEXT_ITEM_ID: &str = "next_item_id";

/// Fjall-backed persistence for items, idempotency records and fault-simulation sessions
///
/// Reads go straight to the partitions. Every mutation goes through a
/// [`WriteScope`], which holds the store-wide writer lock and stages its writes
/// in a single atomic batch.
#[derive(Clone)]
pub struct Store {
    keyspace: Keyspace,
    items: PartitionHandle,
    idempotency: PartitionHandle,
    sessions: PartitionHandle,
    metadata: PartitionHandle,
    writer: Arc<Mutex<()>>,
}

impl Store {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let items = keyspace.open_partition("items", PartitionCreateOptions::default())?;
        let idempotency =
            keyspace.open_partition("idempotency", PartitionCreateOptions::default())?;
        let sessions = keyspace.open_partition("sessions", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            items,
            idempotency,
            sessions,
            metadata,
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Begin a serialized write scope. Nothing is visible until [`WriteScope::commit`].
    pub fn write(&self) -> WriteScope<'_> {
        // The lock guards no data, so a poisoned lock is still usable
        let guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        WriteScope {
            store: self,
            batch: self.keyspace.batch(),
            next_id: None,
            recorded: HashSet::new(),
            _guard: guard,
        }
    }

    /// Get an item by id
    pub fn get_item(&self, id: u64) -> Result<Option<Item>> {
        match self.items.get(encode_item_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All items in ascending id order
    pub fn list_items(&self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        for entry in self.items.iter() {
            let (key, value) = entry?;
            if decode_item_key(&key).is_none() {
                return Err(StoreError::Corrupt(String::from_utf8_lossy(&key).into_owned()));
            }
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    /// Look up a previously recorded response for (key, endpoint)
    pub fn lookup_response(&self, key: &str, endpoint: &str) -> Result<Option<StoredResponse>> {
        Ok(self
            .idempotency_record(key, endpoint)?
            .map(|record| record.response()))
    }

    pub fn idempotency_record(&self, key: &str, endpoint: &str) -> Result<Option<IdempotencyRecord>> {
        match self.idempotency.get(encode_idem_key(endpoint, key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Record a response outside of any mutation. Fails with `Conflict` if already present.
    pub fn record_response(
        &self,
        key: &str,
        endpoint: &str,
        response: &StoredResponse,
    ) -> Result<()> {
        let mut scope = self.write();
        scope.record_response(key, endpoint, response)?;
        scope.commit()
    }

    /// Current value of a per-session fault counter; zero when never seen
    pub fn session_counter(&self, session_id: &str, counter: &str) -> Result<u32> {
        match self.sessions.get(encode_session_key(session_id, counter))? {
            Some(value) => {
                let stored: SessionCounter = serde_json::from_slice(&value).map_err(|_| {
                    StoreError::Corrupt(format!("session:{}/{}", session_id, counter))
                })?;
                Ok(stored.value)
            }
            None => Ok(0),
        }
    }

    /// Store a session counter. Zero is the unseen state, so it removes the row.
    pub fn set_session_counter(&self, session_id: &str, counter: &str, value: u32) -> Result<()> {
        let key = encode_session_key(session_id, counter);
        if value == 0 {
            self.sessions.remove(key)?;
        } else {
            let stored = SessionCounter {
                value,
                touched_at: Utc::now(),
            };
            self.sessions.insert(key, serde_json::to_vec(&stored)?)?;
        }
        debug!(session_id, counter, value, "Session counter updated");
        Ok(())
    }

    pub(crate) fn idempotency_partition(&self) -> &PartitionHandle {
        &self.idempotency
    }

    pub(crate) fn sessions_partition(&self) -> &PartitionHandle {
        &self.sessions
    }

    pub(crate) fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut item_count = 0;
        let mut idem_count = 0;
        let mut session_counters = 0;

        for entry in self.items.iter() {
            entry?;
            item_count += 1;
        }

        for entry in self.idempotency.iter() {
            entry?;
            idem_count += 1;
        }

        for entry in self.sessions.iter() {
            entry?;
            session_counters += 1;
        }

        Ok(StoreStats {
            item_count,
            idem_count,
            session_counters,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub item_count: usize,
    pub idem_count: usize,
    pub session_counters: usize,
}

/// Exclusive, atomic unit of work against the store
///
/// Holds the writer lock for its whole lifetime, so a lookup performed through
/// the scope cannot be invalidated by another writer before the commit.
/// Dropping the scope without committing discards every staged write.
pub struct WriteScope<'a> {
    store: &'a Store,
    batch: Batch,
    next_id: Option<u64>,
    recorded: HashSet<Vec<u8>>,
    _guard: MutexGuard<'a, ()>,
}

impl WriteScope<'_> {
    pub fn get_item(&self, id: u64) -> Result<Option<Item>> {
        self.store.get_item(id)
    }

    /// Stage a new item and return it with its freshly assigned id
    pub fn insert_item(&mut self, new_item: NewItem) -> Result<Item> {
        let id = match self.next_id {
            Some(id) => id,
            None => self.load_next_id()?,
        };
        let following = id.checked_add(1).ok_or(StoreError::IdExhausted)?;

        let item = Item {
            id,
            name: new_item.name,
            price: new_item.price,
        };

        self.batch.insert(
            &self.store.items,
            encode_item_key(id),
            serde_json::to_vec(&item)?,
        );
        self.batch.insert(
            &self.store.metadata,
            encode_meta_key(META_NEXT_ITEM_ID),
            following.to_string().into_bytes(),
        );
        self.next_id = Some(following);

        debug!(id, "Staged item insert");
        Ok(item)
    }

    /// Stage an overwrite of an existing item
    pub fn put_item(&mut self, item: &Item) -> Result<()> {
        self.batch.insert(
            &self.store.items,
            encode_item_key(item.id),
            serde_json::to_vec(item)?,
        );
        debug!(id = item.id, "Staged item update");
        Ok(())
    }

    /// Stage removal of an item. Returns false if no such item exists.
    pub fn remove_item(&mut self, id: u64) -> Result<bool> {
        let key = encode_item_key(id);
        if !self.store.items.contains_key(&key)? {
            return Ok(false);
        }
        self.batch.remove(&self.store.items, key);
        debug!(id, "Staged item removal");
        Ok(true)
    }

    pub fn lookup_response(&self, key: &str, endpoint: &str) -> Result<Option<StoredResponse>> {
        self.store.lookup_response(key, endpoint)
    }

    /// Stage an idempotency record. The first writer for (key, endpoint) wins.
    pub fn record_response(
        &mut self,
        key: &str,
        endpoint: &str,
        response: &StoredResponse,
    ) -> Result<()> {
        let idem_key = encode_idem_key(endpoint, key);
        if self.recorded.contains(&idem_key) || self.store.idempotency.contains_key(&idem_key)? {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        let record = IdempotencyRecord {
            idempotency_key: key.to_string(),
            endpoint: endpoint.to_string(),
            response_status: response.status,
            response_data: response.body.clone(),
            created_at: Utc::now(),
        };
        self.batch.insert(
            &self.store.idempotency,
            idem_key.clone(),
            serde_json::to_vec(&record)?,
        );
        self.recorded.insert(idem_key);

        debug!(key, endpoint, status = response.status, "Staged idempotency record");
        Ok(())
    }

    /// Apply every staged write atomically
    pub fn commit(self) -> Result<()> {
        self.batch.commit()?;
        Ok(())
    }

    fn load_next_id(&self) -> Result<u64> {
        match self.store.metadata.get(encode_meta_key(META_NEXT_ITEM_ID))? {
            Some(value) => std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| StoreError::Corrupt(META_NEXT_ITEM_ID.to_string())),
            None => Ok(1),
        }
    }
}
