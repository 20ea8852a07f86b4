use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Entity, InventoryItemId, MovementId, UserId};

/// Typed cause of a stock-quantity change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Receipt,
    Return,
    TransferIn,
    Issue,
    Damage,
    Expired,
    TransferOut,
    /// Absolute set (reconciliation/correction), not a delta.
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "RECEIPT",
            Self::Return => "RETURN",
            Self::TransferIn => "TRANSFER_IN",
            Self::Issue => "ISSUE",
            Self::Damage => "DAMAGE",
            Self::Expired => "EXPIRED",
            Self::TransferOut => "TRANSFER_OUT",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Receipt | Self::Return | Self::TransferIn)
    }

    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            Self::Issue | Self::Damage | Self::Expired | Self::TransferOut
        )
    }

    /// Compute the stock level this movement produces.
    ///
    /// Inbound types add the quantity's magnitude, outbound types subtract it
    /// (failing rather than going negative), and `Adjustment` sets the level
    /// to `quantity` outright. Zero quantities are rejected for delta types;
    /// an adjustment to exactly zero is a legitimate correction.
    pub fn apply_to(self, previous_stock: i64, quantity: i64) -> DomainResult<i64> {
        if self != Self::Adjustment && quantity == 0 {
            return Err(DomainError::validation("quantity cannot be zero"));
        }

        let magnitude = quantity.abs();
        match self {
            Self::Receipt | Self::Return | Self::TransferIn => Ok(previous_stock + magnitude),
            Self::Issue | Self::Damage | Self::Expired | Self::TransferOut => {
                let new_stock = previous_stock - magnitude;
                if new_stock < 0 {
                    return Err(DomainError::InsufficientStock {
                        requested: magnitude,
                        available: previous_stock,
                    });
                }
                Ok(new_stock)
            }
            Self::Adjustment => {
                if quantity < 0 {
                    return Err(DomainError::validation(
                        "adjustment target cannot be negative",
                    ));
                }
                Ok(quantity)
            }
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIPT" => Ok(Self::Receipt),
            "RETURN" => Ok(Self::Return),
            "TRANSFER_IN" => Ok(Self::TransferIn),
            "ISSUE" => Ok(Self::Issue),
            "DAMAGE" => Ok(Self::Damage),
            "EXPIRED" => Ok(Self::Expired),
            "TRANSFER_OUT" => Ok(Self::TransferOut),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            other => Err(DomainError::invalid_movement_type(other)),
        }
    }
}

/// One committed stock-affecting event. Immutable once written: the ledger
/// is append-only and rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub item_id: InventoryItemId,
    pub movement_type: MovementType,
    /// Recorded exactly as supplied by the caller; the stock delta always
    /// uses its magnitude.
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A ledger entry awaiting commit, produced inside an adjustment
/// transaction once the new stock level is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub item_id: InventoryItemId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub ip_address: Option<String>,
}

impl NewMovement {
    /// Stamp identity + commit time, yielding the immutable ledger row.
    pub fn record(self, now: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id: MovementId::new(),
            item_id: self.item_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            previous_stock: self.previous_stock,
            new_stock: self.new_stock,
            reference_number: self.reference_number,
            notes: self.notes,
            user_id: self.user_id,
            ip_address: self.ip_address,
            created_at: now,
        }
    }
}
