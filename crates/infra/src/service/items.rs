//! Item registry: registration, descriptive updates, soft deletion.

use chrono::Utc;
use tracing::instrument;

use stockbook_core::{DomainError, InventoryItemId};
use stockbook_inventory::{InventoryItem, ItemUpdate, NewInventoryItem};

use crate::store::{StockStore, StoreError, TxEffects};

use super::InventoryError;

/// Registry for the item catalog.
///
/// Stock quantities are out of bounds here; they move only through the
/// adjustment coordinator. Updates and deactivation still take the per-item
/// lock so they cannot interleave with an in-flight adjustment.
#[derive(Debug, Clone)]
pub struct ItemRegistry<S> {
    store: S,
}

impl<S> ItemRegistry<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a new stock-keeping unit. Fails with `DuplicateSku` when
    /// the SKU is already taken.
    #[instrument(skip(self, new), fields(sku = %new.sku), err)]
    pub async fn register(&self, new: NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        let sku = new.sku.clone();
        let item = InventoryItem::register(new, Utc::now())?;
        match self.store.insert_item(item).await {
            Ok(item) => Ok(item),
            Err(StoreError::DuplicateKey(_)) => {
                Err(DomainError::duplicate_sku(sku).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch an item by id, active or soft-deleted.
    #[instrument(skip(self), fields(item_id = %item_id), err)]
    pub async fn get(&self, item_id: InventoryItemId) -> Result<InventoryItem, InventoryError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Fetch an item by SKU.
    #[instrument(skip(self), err)]
    pub async fn get_by_sku(&self, sku: &str) -> Result<InventoryItem, InventoryError> {
        self.store
            .find_item_by_sku(sku)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Update descriptive fields (name, category, supplier, thresholds,
    /// pricing) under the item lock.
    #[instrument(skip(self, update), fields(item_id = %item_id), err)]
    pub async fn update(
        &self,
        item_id: InventoryItemId,
        update: ItemUpdate,
    ) -> Result<InventoryItem, InventoryError> {
        let outcome = self
            .store
            .with_item_lock(
                item_id,
                Box::new(move |item, _| {
                    let mut updated = item.clone();
                    updated.apply_update(update)?;
                    Ok(TxEffects::item_only(updated))
                }),
            )
            .await?;

        Ok(outcome.item)
    }

    /// Soft-delete an item. The row and its ledger survive; the item just
    /// stops accepting adjustments and drops out of active queries.
    #[instrument(skip(self), fields(item_id = %item_id), err)]
    pub async fn deactivate(&self, item_id: InventoryItemId) -> Result<InventoryItem, InventoryError> {
        let outcome = self
            .store
            .with_item_lock(
                item_id,
                Box::new(|item, _| {
                    let mut updated = item.clone();
                    updated.deactivate();
                    Ok(TxEffects::item_only(updated))
                }),
            )
            .await?;

        Ok(outcome.item)
    }
}
