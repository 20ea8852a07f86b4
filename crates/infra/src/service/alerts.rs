//! Alert acknowledgment and listing.
//!
//! Raising alerts is not an operation here: alerts are raised only inside
//! adjustment transactions, by the threshold check the coordinator runs.

use chrono::Utc;
use tracing::instrument;

use stockbook_core::{AlertId, DomainError, UserId};
use stockbook_inventory::{AlertType, StockAlert};

use crate::store::{AlertFilter, StockStore};

use super::InventoryError;

#[derive(Debug, Clone)]
pub struct AlertService<S> {
    store: S,
}

impl<S> AlertService<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Operator acknowledgment. Deliberately non-transactional: it touches
    /// a single alert row and never races with the dedup check, which only
    /// looks at `ACTIVE` rows under the item lock.
    #[instrument(skip(self), fields(alert_id = %alert_id), err)]
    pub async fn acknowledge(
        &self,
        alert_id: AlertId,
        user_id: UserId,
    ) -> Result<StockAlert, InventoryError> {
        let mut alert = self
            .store
            .get_alert(alert_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        alert.acknowledge(user_id, Utc::now());
        self.store.save_alert(&alert).await?;
        Ok(alert)
    }

    /// Alerts matching a filter, newest trigger first.
    #[instrument(skip(self, filter), err)]
    pub async fn list(&self, filter: AlertFilter) -> Result<Vec<StockAlert>, InventoryError> {
        Ok(self.store.list_alerts(filter).await?)
    }

    /// The active low-stock feed.
    pub async fn active_low_stock(&self) -> Result<Vec<StockAlert>, InventoryError> {
        self.list(AlertFilter::active(AlertType::LowStock)).await
    }

    /// The active out-of-stock feed.
    pub async fn active_out_of_stock(&self) -> Result<Vec<StockAlert>, InventoryError> {
        self.list(AlertFilter::active(AlertType::OutOfStock)).await
    }
}
