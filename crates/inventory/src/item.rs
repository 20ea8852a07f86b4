use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Entity, InventoryItemId};

/// Current mutable stock state for one stock-keeping unit.
///
/// Stock fields (`current_stock`, `reserved_stock`) are mutated exclusively
/// through the adjustment coordinator, under an exclusive per-item lock.
/// Everything else is descriptive state the registry may update directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    /// Unique, externally meaningful identifier.
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub current_stock: i64,
    pub reserved_stock: i64,
    pub reorder_point: Option<i64>,
    pub max_stock_level: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    /// false = soft-deleted. Items are never hard-deleted so movement rows
    /// keep a valid referent.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl InventoryItem {
    /// Register a new item. Enforces field validity; SKU uniqueness is
    /// enforced by the store at insert time.
    pub fn register(new: NewInventoryItem, now: DateTime<Utc>) -> DomainResult<Self> {
        if new.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if new.initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        if matches!(new.reorder_point, Some(rp) if rp < 0) {
            return Err(DomainError::validation("reorder point cannot be negative"));
        }
        if matches!(new.max_stock_level, Some(max) if max < 0) {
            return Err(DomainError::validation("max stock level cannot be negative"));
        }

        Ok(Self {
            id: InventoryItemId::new(),
            sku: new.sku,
            name: new.name,
            category: new.category,
            supplier: new.supplier,
            current_stock: new.initial_stock,
            reserved_stock: 0,
            reorder_point: new.reorder_point,
            max_stock_level: new.max_stock_level,
            unit_cost: new.unit_cost,
            selling_price: new.selling_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Quantity eligible for new reservations or sale.
    pub fn available_stock(&self) -> i64 {
        self.current_stock - self.reserved_stock
    }

    pub fn is_low_stock(&self) -> bool {
        matches!(self.reorder_point, Some(rp) if self.current_stock <= rp)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock <= 0
    }

    /// Place a soft hold against available stock. Does not change
    /// `current_stock`. The store stamps `updated_at` when the change
    /// commits.
    pub fn reserve(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("reservation quantity must be positive"));
        }
        let available = self.available_stock();
        if available < quantity {
            return Err(DomainError::InsufficientAvailableStock {
                requested: quantity,
                available,
            });
        }
        self.reserved_stock += quantity;
        Ok(())
    }

    /// Release a soft hold. Floored at zero: a release without a matching
    /// reserve must never produce a negative reservation.
    pub fn release_reserved(&mut self, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation("release quantity must be positive"));
        }
        self.reserved_stock = (self.reserved_stock - quantity).max(0);
        Ok(())
    }

    /// Apply a registry update (non-stock fields only).
    pub fn apply_update(&mut self, update: ItemUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        if let Some(supplier) = update.supplier {
            self.supplier = Some(supplier);
        }
        if let Some(rp) = update.reorder_point {
            if rp < 0 {
                return Err(DomainError::validation("reorder point cannot be negative"));
            }
            self.reorder_point = Some(rp);
        }
        if let Some(max) = update.max_stock_level {
            if max < 0 {
                return Err(DomainError::validation("max stock level cannot be negative"));
            }
            self.max_stock_level = Some(max);
        }
        if let Some(cost) = update.unit_cost {
            self.unit_cost = Some(cost);
        }
        if let Some(price) = update.selling_price {
            self.selling_price = Some(price);
        }
        Ok(())
    }

    /// Soft delete. The row survives so the movement ledger stays intact.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// Registration payload for a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub initial_stock: i64,
    pub reorder_point: Option<i64>,
    pub max_stock_level: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
}

impl NewInventoryItem {
    /// Minimal registration: sku + name, everything else defaulted.
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: None,
            supplier: None,
            initial_stock: 0,
            reorder_point: None,
            max_stock_level: None,
            unit_cost: None,
            selling_price: None,
        }
    }
}

/// Partial update of descriptive item fields. `None` leaves a field
/// unchanged. Stock quantities are deliberately absent: they move only
/// through the adjustment coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub reorder_point: Option<i64>,
    pub max_stock_level: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_item(stock: i64) -> InventoryItem {
        let mut new = NewInventoryItem::new("SKU-001", "Widget");
        new.initial_stock = stock;
        InventoryItem::register(new, test_time()).unwrap()
    }

    #[test]
    fn register_rejects_empty_sku() {
        let new = NewInventoryItem::new("   ", "Widget");
        let err = InventoryItem::register(new, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_rejects_negative_initial_stock() {
        let mut new = NewInventoryItem::new("SKU-001", "Widget");
        new.initial_stock = -1;
        let err = InventoryItem::register(new, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn available_stock_subtracts_reservations() {
        let mut item = test_item(10);
        item.reserve(3).unwrap();
        assert_eq!(item.current_stock, 10);
        assert_eq!(item.reserved_stock, 3);
        assert_eq!(item.available_stock(), 7);
    }

    #[test]
    fn reserve_fails_when_available_is_exceeded() {
        let mut item = test_item(4);
        item.reserve(3).unwrap();
        let err = item.reserve(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientAvailableStock { requested: 2, available: 1 }
        );
        // Failed reserve leaves state untouched.
        assert_eq!(item.reserved_stock, 3);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut item = test_item(10);
        item.reserve(2).unwrap();
        item.release_reserved(5).unwrap();
        assert_eq!(item.reserved_stock, 0);
    }

    #[test]
    fn reserve_rejects_non_positive_quantity() {
        let mut item = test_item(10);
        assert!(item.reserve(0).is_err());
        assert!(item.reserve(-2).is_err());
    }

    #[test]
    fn low_stock_requires_a_reorder_point() {
        let mut item = test_item(0);
        assert!(!item.is_low_stock());
        item.reorder_point = Some(5);
        assert!(item.is_low_stock());
        item.current_stock = 6;
        assert!(!item.is_low_stock());
    }

    #[test]
    fn update_touches_only_supplied_fields() {
        let mut item = test_item(10);
        let update = ItemUpdate {
            name: Some("Widget v2".to_string()),
            reorder_point: Some(4),
            ..ItemUpdate::default()
        };
        item.apply_update(update).unwrap();
        assert_eq!(item.name, "Widget v2");
        assert_eq!(item.reorder_point, Some(4));
        assert_eq!(item.sku, "SKU-001");
        assert_eq!(item.current_stock, 10);
    }

    #[test]
    fn deactivate_is_a_soft_delete() {
        let mut item = test_item(10);
        item.deactivate();
        assert!(!item.is_active);
        assert_eq!(item.current_stock, 10);
    }
}
