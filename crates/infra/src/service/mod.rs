//! Application services over the stock store.
//!
//! Each service composes pure domain logic with the store's locked
//! transaction primitive. Business rules never live in the store; storage
//! mechanics never live in the domain crate.

use thiserror::Error;

use stockbook_core::DomainError;

use crate::store::{StoreError, TxFailure};

pub mod adjustment;
pub mod alerts;
pub mod items;
pub mod reporting;

pub use adjustment::{AdjustStock, AdjustmentService};
pub use alerts::AlertService;
pub use items::ItemRegistry;
pub use reporting::InventoryReports;

/// Service-boundary error: either a deterministic business failure or a
/// transient infrastructure failure. The two propagate differently:
/// business failures are final until the caller changes its request;
/// infrastructure failures are safe to retry because no partial state ever
/// commits.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TxFailure> for InventoryError {
    fn from(value: TxFailure) -> Self {
        match value {
            TxFailure::Domain(e) => Self::Domain(e),
            TxFailure::Store(e) => Self::Store(e),
        }
    }
}

impl InventoryError {
    /// Stable machine-readable code for client UIs; distinct per error kind
    /// so clients can tell "insufficient stock" from "not found" from
    /// "try again".
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Store(StoreError::LockTimeout(_)) => "lock_timeout",
            Self::Store(StoreError::Transaction(_)) => "transaction_failure",
            Self::Store(StoreError::Connection(_)) => "connection_failure",
            Self::Store(StoreError::DuplicateKey(_)) => "duplicate_key",
            Self::Store(StoreError::Corrupt(_)) => "storage_corruption",
        }
    }

    /// True for infrastructure failures a caller may retry as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Domain(_) => false,
            Self::Store(e) => e.is_transient(),
        }
    }
}
