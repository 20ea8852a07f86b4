//! Read-side filter and pagination types.
//!
//! Plain predicate/window descriptors with no invariants of their own; the
//! stores compile them into their native filtering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::InventoryItemId;
use stockbook_inventory::{AlertStatus, AlertType, InventoryItem, MovementType, StockMovement};

/// Pagination parameters for item and movement queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for item search. All fields optional; absent means
/// "don't care".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring match against SKU or name.
    pub search: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    /// `Some(true)` keeps only items at or below their reorder point,
    /// `Some(false)` only items above it.
    pub low_stock: Option<bool>,
    pub out_of_stock: Option<bool>,
    /// Soft-deleted items are excluded unless this is set.
    pub include_inactive: bool,
}

/// Paginated item search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<InventoryItem>,
    /// Total number of items matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Filter criteria for ledger readback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

/// Paginated ledger readback result, in commit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementPage {
    pub movements: Vec<StockMovement>,
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Filter criteria for alert listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    pub item_id: Option<InventoryItemId>,
    pub alert_type: Option<AlertType>,
    pub status: Option<AlertStatus>,
}

impl AlertFilter {
    /// Active alerts of one type, the feed shape the HTTP layer consumes.
    pub fn active(alert_type: AlertType) -> Self {
        Self {
            item_id: None,
            alert_type: Some(alert_type),
            status: Some(AlertStatus::Active),
        }
    }
}

/// Aggregate stock valuation over active items.
///
/// `total_value` sums `current_stock * unit_cost` over items with a known
/// unit cost; the unit and item counts cover all active items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub total_value: Decimal,
    pub total_units: i64,
    pub item_count: u64,
}
