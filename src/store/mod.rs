//! Fjall-based persistence for ItemBox
//!
//! One embedded LSM keyspace holds four partitions:
//!
//! - `items`: the item collection
//! - `idempotency`: responses recorded per (idempotency key, endpoint)
//! - `sessions`: fault-simulation counters per client session, pruned when idle
//! - `metadata`: the item id allocator
//!
//! ## Atomicity
//!
//! Mutations are staged in a [`WriteScope`] obtained from [`Store::write`].
//! The scope holds a store-wide writer lock and commits all staged writes as a
//! single Fjall batch, so an item mutation and the idempotency record that
//! replays it land together or not at all.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use itembox::store::{NewItem, Store};
//!
//! let store = Store::open("data/itembox")?;
//! let mut scope = store.write();
//! let item = scope.insert_item(NewItem { name: "Widget".into(), price: Price::ZERO })?;
//! scope.commit()?;
//! ```

pub mod engine;
pub mod error;
pub mod models;
pub mod partitions;
pub mod retention;

pub use engine::{Store, StoreStats, WriteScope};
pub use error::{Result, StoreError};
pub use models::{IdempotencyRecord, Item, NewItem, SessionCounter, StoredResponse};
pub use retention::{PruneStats, RETENTION_IDEMPOTENCY_DAYS, RETENTION_SESSION_HOURS};
