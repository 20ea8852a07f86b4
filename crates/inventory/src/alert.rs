use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{AlertId, Entity, InventoryItemId, UserId};

use crate::item::InventoryItem;

/// Threshold boundary an alert reports on.
///
/// The engine itself only raises `LowStock` and `OutOfStock`; the other
/// kinds exist for operators and downstream tooling that record alerts
/// through the same table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Overstock,
    ExpiryWarning,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "LOW_STOCK",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Overstock => "OVERSTOCK",
            Self::ExpiryWarning => "EXPIRY_WARNING",
        }
    }
}

impl core::fmt::Display for AlertType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    /// Set by downstream consumers, never by the engine.
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        }
    }
}

/// A deduplicated threshold-crossing notification.
///
/// Invariant: at most one `Active` alert of a given type exists per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub item_id: InventoryItemId,
    pub alert_type: AlertType,
    pub threshold_value: i64,
    pub status: AlertStatus,
    pub last_triggered: DateTime<Utc>,
    pub acknowledged_by: Option<UserId>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Entity for StockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl StockAlert {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// Operator acknowledgment. Idempotent on the status itself; the actor
    /// and timestamp reflect the latest call.
    pub fn acknowledge(&mut self, user_id: UserId, now: DateTime<Utc>) {
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = Some(user_id);
        self.acknowledged_at = Some(now);
    }
}

/// An alert the threshold evaluator decided to raise, awaiting commit in the
/// same transaction as the stock change that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub item_id: InventoryItemId,
    pub alert_type: AlertType,
    pub threshold_value: i64,
}

impl NewAlert {
    pub fn raise(self, now: DateTime<Utc>) -> StockAlert {
        StockAlert {
            id: AlertId::new(),
            item_id: self.item_id,
            alert_type: self.alert_type,
            threshold_value: self.threshold_value,
            status: AlertStatus::Active,
            last_triggered: now,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }
}

/// Threshold evaluation, run against the already-updated item inside the
/// adjustment transaction.
///
/// Checks low stock first, then out of stock. The checks are independent:
/// an item can hold both alert types at once. Deduplication is purely by
/// the existence of an active row of the same type, so repeated breaches
/// while an alert is active are no-ops.
pub fn evaluate_alerts(item: &InventoryItem, active_alerts: &[StockAlert]) -> Vec<NewAlert> {
    let has_active = |alert_type: AlertType| {
        active_alerts
            .iter()
            .any(|a| a.is_active() && a.alert_type == alert_type && a.item_id == item.id)
    };

    let mut raised = Vec::new();

    if let Some(reorder_point) = item.reorder_point {
        if item.current_stock <= reorder_point && !has_active(AlertType::LowStock) {
            raised.push(NewAlert {
                item_id: item.id,
                alert_type: AlertType::LowStock,
                threshold_value: reorder_point,
            });
        }
    }

    if item.current_stock <= 0 && !has_active(AlertType::OutOfStock) {
        raised.push(NewAlert {
            item_id: item.id,
            alert_type: AlertType::OutOfStock,
            threshold_value: 0,
        });
    }

    raised
}
