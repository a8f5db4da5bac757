//! Item service: validation and orchestration over the store
//!
//! Every operation returns an explicit [`ServiceError`] variant instead of
//! signalling through panics. Mutations come in two flavours: `create`,
//! `update` and `delete` run in their own write scope, while the `*_in`
//! variants stage their writes into a caller-supplied [`WriteScope`] so the
//! caller can commit them together with an idempotency record.

mod validation;

pub use validation::{MAX_NAME_CHARS, ValidationError, validate_name, validate_price};

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::price::Price;
use crate::store::{Item, NewItem, Store, StoreError, WriteScope};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("item {0} not found")]
    NotFound(u64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Unvalidated item fields as supplied by a client
#[derive(Debug, Clone, Default)]
pub struct ItemInput {
    pub name: Option<String>,
    pub price: Option<Value>,
}

pub struct ItemService {
    store: Arc<Store>,
}

impl ItemService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Item>> {
        Ok(self.store.list_items()?)
    }

    pub fn get(&self, id: u64) -> Result<Item> {
        self.store.get_item(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn create(&self, input: ItemInput) -> Result<Item> {
        let mut scope = self.store.write();
        let item = Self::create_in(&mut scope, input)?;
        scope.commit()?;
        Ok(item)
    }

    pub fn update(&self, id: u64, input: ItemInput) -> Result<Item> {
        let mut scope = self.store.write();
        let item = Self::update_in(&mut scope, id, input)?;
        scope.commit()?;
        Ok(item)
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        let mut scope = self.store.write();
        Self::delete_in(&mut scope, id)?;
        scope.commit()?;
        Ok(())
    }

    /// Validate and stage a new item; price defaults to 0.00
    pub fn create_in(scope: &mut WriteScope<'_>, input: ItemInput) -> Result<Item> {
        let name = validate_name(input.name.as_deref())?;
        let price = validate_price(input.price.as_ref())?.unwrap_or(Price::ZERO);

        let item = scope.insert_item(NewItem { name, price })?;
        info!(id = item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Stage an update. Existence is checked before the payload is validated;
    /// an omitted price keeps the stored one.
    pub fn update_in(scope: &mut WriteScope<'_>, id: u64, input: ItemInput) -> Result<Item> {
        let mut item = scope.get_item(id)?.ok_or(ServiceError::NotFound(id))?;

        let name = validate_name(input.name.as_deref())?;
        let price = validate_price(input.price.as_ref())?;

        item.name = name;
        if let Some(price) = price {
            item.price = price;
        }

        scope.put_item(&item)?;
        info!(id, "Item updated");
        Ok(item)
    }

    pub fn delete_in(scope: &mut WriteScope<'_>, id: u64) -> Result<()> {
        if !scope.remove_item(id)? {
            return Err(ServiceError::NotFound(id));
        }
        info!(id, "Item deleted");
        Ok(())
    }
}
