//! In-memory stock store for tests and development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use stockbook_core::{AlertId, DomainError, InventoryItemId};
use stockbook_inventory::{InventoryItem, StockAlert, StockMovement};

use super::query::{
    AlertFilter, InventoryValuation, ItemFilter, ItemPage, MovementFilter, MovementPage,
    Pagination,
};
use super::{Decide, StockStore, StoreError, TxFailure, TxOutcome};

#[derive(Debug, Default)]
struct State {
    items: HashMap<InventoryItemId, InventoryItem>,
    sku_index: HashMap<String, InventoryItemId>,
    movements: Vec<StockMovement>,
    alerts: HashMap<AlertId, StockAlert>,
}

/// Mutex-guarded in-memory store.
///
/// `with_item_lock` holds the state mutex for the whole decision + persist
/// sequence, so mutations of any one item are serialized exactly as the
/// Postgres row lock serializes them (in fact more coarsely: this store
/// serializes across items too, which is fine at test/dev scale).
///
/// Cloning shares the underlying state, like cloning a pool-backed store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn item_matches(item: &InventoryItem, filter: &ItemFilter) -> bool {
    if !filter.include_inactive && !item.is_active {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !item.sku.to_lowercase().contains(&needle)
            && !item.name.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if item.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(supplier) = &filter.supplier {
        if item.supplier.as_deref() != Some(supplier.as_str()) {
            return false;
        }
    }
    if let Some(low) = filter.low_stock {
        if item.is_low_stock() != low {
            return false;
        }
    }
    if let Some(out) = filter.out_of_stock {
        if item.is_out_of_stock() != out {
            return false;
        }
    }
    true
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.sku_index.contains_key(&item.sku) {
            return Err(StoreError::DuplicateKey(item.sku));
        }
        state.sku_index.insert(item.sku.clone(), item.id);
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.items.get(&item_id).cloned())
    }

    async fn find_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sku_index
            .get(sku)
            .and_then(|id| state.items.get(id))
            .cloned())
    }

    async fn with_item_lock(
        &self,
        item_id: InventoryItemId,
        decide: Decide,
    ) -> Result<TxOutcome, TxFailure> {
        // The mutex is the lock: held from read to commit, nothing
        // interleaves. No await points occur while it is held.
        let mut state = self.state.lock().unwrap();

        let item = match state.items.get(&item_id) {
            Some(item) if item.is_active => item.clone(),
            _ => return Err(DomainError::not_found().into()),
        };

        let active_alerts: Vec<StockAlert> = state
            .alerts
            .values()
            .filter(|a| a.item_id == item_id && a.is_active())
            .cloned()
            .collect();

        let effects = decide(&item, &active_alerts)?;

        // Commit-time stamp shared by the row update, the ledger entry, and
        // any raised alerts.
        let now = Utc::now();
        let mut updated = effects.item;
        updated.updated_at = now;
        state.items.insert(item_id, updated.clone());

        let movement = effects.movement.map(|m| {
            let movement = m.record(now);
            state.movements.push(movement.clone());
            movement
        });

        let mut raised_alerts = Vec::with_capacity(effects.new_alerts.len());
        for new_alert in effects.new_alerts {
            // Same guarantee the partial unique index gives Postgres: one
            // active alert per (item, type).
            let duplicate = state.alerts.values().any(|a| {
                a.item_id == new_alert.item_id
                    && a.alert_type == new_alert.alert_type
                    && a.is_active()
            });
            if duplicate {
                return Err(StoreError::DuplicateKey(format!(
                    "active {} alert already exists for item {}",
                    new_alert.alert_type, new_alert.item_id
                ))
                .into());
            }
            let alert = new_alert.raise(now);
            state.alerts.insert(alert.id, alert.clone());
            raised_alerts.push(alert);
        }

        Ok(TxOutcome {
            item: updated,
            movement,
            raised_alerts,
        })
    }

    async fn list_movements(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut movements: Vec<_> = state
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect();
        movements.sort_by_key(|m| (m.created_at, m.id));
        Ok(movements)
    }

    async fn movement_page(
        &self,
        item_id: InventoryItemId,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> = state
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .filter(|m| {
                filter
                    .movement_type
                    .is_none_or(|mt| m.movement_type == mt)
            })
            .filter(|m| filter.created_after.is_none_or(|t| m.created_at >= t))
            .filter(|m| filter.created_before.is_none_or(|t| m.created_at <= t))
            .cloned()
            .collect();
        matching.sort_by_key(|m| (m.created_at, m.id));

        let total = matching.len() as u64;
        let movements: Vec<_> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > (pagination.offset + pagination.limit) as u64;

        Ok(MovementPage {
            movements,
            total,
            pagination,
            has_more,
        })
    }

    async fn get_alert(&self, alert_id: AlertId) -> Result<Option<StockAlert>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.alerts.get(&alert_id).cloned())
    }

    async fn save_alert(&self, alert: &StockAlert) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.alerts.contains_key(&alert.id) {
            return Err(StoreError::Corrupt(format!(
                "alert {} does not exist",
                alert.id
            )));
        }
        state.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<StockAlert>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut alerts: Vec<_> = state
            .alerts
            .values()
            .filter(|a| filter.item_id.is_none_or(|id| a.item_id == id))
            .filter(|a| filter.alert_type.is_none_or(|t| a.alert_type == t))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        // Newest trigger first; id as a stable tiebreak.
        alerts.sort_by_key(|a| (std::cmp::Reverse(a.last_triggered), a.id));
        Ok(alerts)
    }

    async fn find_low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|i| i.is_active && i.is_low_stock())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(items)
    }

    async fn find_out_of_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|i| i.is_active && i.is_out_of_stock())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(items)
    }

    async fn valuation(&self) -> Result<InventoryValuation, StoreError> {
        let state = self.state.lock().unwrap();
        let mut valuation = InventoryValuation {
            total_value: Decimal::ZERO,
            total_units: 0,
            item_count: 0,
        };
        for item in state.items.values().filter(|i| i.is_active) {
            valuation.item_count += 1;
            valuation.total_units += item.current_stock;
            if let Some(unit_cost) = item.unit_cost {
                valuation.total_value += Decimal::from(item.current_stock) * unit_cost;
            }
        }
        Ok(valuation)
    }

    async fn search_items(
        &self,
        filter: ItemFilter,
        pagination: Pagination,
    ) -> Result<ItemPage, StoreError> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> = state
            .items
            .values()
            .filter(|i| item_matches(i, &filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.sku.cmp(&b.sku));

        let total = matching.len() as u64;
        let items: Vec<_> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > (pagination.offset + pagination.limit) as u64;

        Ok(ItemPage {
            items,
            total,
            pagination,
            has_more,
        })
    }
}
