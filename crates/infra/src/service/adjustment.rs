//! The adjustment coordinator: every change to physical or reserved stock
//! goes through here, as one locked transaction per call.

use tracing::instrument;

use stockbook_core::{DomainError, InventoryItemId, UserId};
use stockbook_inventory::{InventoryItem, MovementType, NewMovement, evaluate_alerts};

use crate::store::{StockStore, TxEffects};

use super::InventoryError;

/// One stock adjustment request, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct AdjustStock {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub ip_address: Option<String>,
}

impl AdjustStock {
    pub fn new(movement_type: MovementType, quantity: i64, user_id: UserId) -> Self {
        Self {
            movement_type,
            quantity,
            reference_number: None,
            notes: None,
            user_id,
            ip_address: None,
        }
    }
}

/// Orchestrates stock adjustments and reservations.
///
/// Every operation acquires the exclusive per-item lock for the duration of
/// one transaction, so concurrent calls against the same item serialize and
/// the movement ledger reflects true commit order. All decision logic runs
/// before any write: a rejected request leaves the item, the ledger, and
/// the alert table untouched.
#[derive(Debug, Clone)]
pub struct AdjustmentService<S> {
    store: S,
}

impl<S> AdjustmentService<S>
where
    S: StockStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply one stock movement and return the updated item.
    ///
    /// Within the transaction this: computes the new stock level from the
    /// movement type, persists the item, appends exactly one ledger row
    /// capturing the previous/new stock snapshot, and runs the threshold
    /// check against the updated item. The three effects commit or roll
    /// back together.
    ///
    /// Outbound movements (and absolute adjustments) may not take
    /// `current_stock` below `reserved_stock`; reserved quantities must be
    /// released before the stock physically leaves.
    #[instrument(skip(self, request), fields(item_id = %item_id, movement_type = %request.movement_type, quantity = request.quantity), err)]
    pub async fn adjust_stock(
        &self,
        item_id: InventoryItemId,
        request: AdjustStock,
    ) -> Result<InventoryItem, InventoryError> {
        let AdjustStock {
            movement_type,
            quantity,
            reference_number,
            notes,
            user_id,
            ip_address,
        } = request;

        let outcome = self
            .store
            .with_item_lock(
                item_id,
                Box::new(move |item, active_alerts| {
                    let previous_stock = item.current_stock;
                    let new_stock = movement_type.apply_to(previous_stock, quantity)?;

                    if new_stock < item.reserved_stock {
                        return Err(DomainError::InsufficientStock {
                            requested: previous_stock - new_stock,
                            available: item.available_stock(),
                        });
                    }

                    let mut updated = item.clone();
                    updated.current_stock = new_stock;

                    let movement = NewMovement {
                        item_id: item.id,
                        movement_type,
                        quantity,
                        previous_stock,
                        new_stock,
                        reference_number,
                        notes,
                        user_id,
                        ip_address,
                    };

                    let new_alerts = evaluate_alerts(&updated, active_alerts);

                    Ok(TxEffects {
                        item: updated,
                        movement: Some(movement),
                        new_alerts,
                    })
                }),
            )
            .await?;

        Ok(outcome.item)
    }

    /// Place a soft hold on available stock. Writes no ledger entry and
    /// triggers no alerts: a reservation is not a physical stock event.
    #[instrument(skip(self), fields(item_id = %item_id, quantity = quantity), err)]
    pub async fn reserve_stock(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
    ) -> Result<InventoryItem, InventoryError> {
        let outcome = self
            .store
            .with_item_lock(
                item_id,
                Box::new(move |item, _| {
                    let mut updated = item.clone();
                    updated.reserve(quantity)?;
                    Ok(TxEffects::item_only(updated))
                }),
            )
            .await?;

        Ok(outcome.item)
    }

    /// Release a soft hold, floored at zero.
    #[instrument(skip(self), fields(item_id = %item_id, quantity = quantity), err)]
    pub async fn release_reserved_stock(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
    ) -> Result<InventoryItem, InventoryError> {
        let outcome = self
            .store
            .with_item_lock(
                item_id,
                Box::new(move |item, _| {
                    let mut updated = item.clone();
                    updated.release_reserved(quantity)?;
                    Ok(TxEffects::item_only(updated))
                }),
            )
            .await?;

        Ok(outcome.item)
    }
}
