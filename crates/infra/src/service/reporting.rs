//! Read-only reporting over committed state. No locking: these queries
//! read whatever the last committed transactions left behind.

use tracing::instrument;

use stockbook_core::InventoryItemId;
use stockbook_inventory::{InventoryItem, StockMovement};

use crate::store::{
    InventoryValuation, ItemFilter, ItemPage, MovementFilter, MovementPage, Pagination,
    StockStore,
};

use super::InventoryError;

#[derive(Debug, Clone)]
pub struct InventoryReports<S> {
    store: S,
}

impl<S> InventoryReports<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Active items at or below their reorder point.
    #[instrument(skip(self), err)]
    pub async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        Ok(self.store.find_low_stock_items().await?)
    }

    /// Active items with nothing on hand.
    #[instrument(skip(self), err)]
    pub async fn out_of_stock_items(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        Ok(self.store.find_out_of_stock_items().await?)
    }

    /// Stock valuation over active items.
    #[instrument(skip(self), err)]
    pub async fn valuation(&self) -> Result<InventoryValuation, InventoryError> {
        Ok(self.store.valuation().await?)
    }

    /// Filtered, paginated item search.
    #[instrument(skip(self, filter), err)]
    pub async fn search(
        &self,
        filter: ItemFilter,
        pagination: Pagination,
    ) -> Result<ItemPage, InventoryError> {
        Ok(self.store.search_items(filter, pagination).await?)
    }

    /// Full ledger for one item in commit order.
    #[instrument(skip(self), fields(item_id = %item_id), err)]
    pub async fn movements(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockMovement>, InventoryError> {
        Ok(self.store.list_movements(item_id).await?)
    }

    /// Filtered, paginated ledger readback for one item.
    #[instrument(skip(self, filter), fields(item_id = %item_id), err)]
    pub async fn movement_history(
        &self,
        item_id: InventoryItemId,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, InventoryError> {
        Ok(self.store.movement_page(item_id, filter, pagination).await?)
    }
}
