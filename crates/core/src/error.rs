//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// invariants, missing rows). Infrastructure concerns (lock timeouts,
/// connection loss) belong to the storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested item or alert was not found, or the item is inactive.
    #[error("not found")]
    NotFound,

    /// Registering an item whose SKU already exists.
    #[error("sku already exists: {0}")]
    DuplicateSku(String),

    /// A decrementing movement would drive `current_stock` negative.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// A reservation request exceeds `available_stock`.
    #[error("insufficient available stock: requested {requested}, available {available}")]
    InsufficientAvailableStock { requested: i64, available: i64 },

    /// Unrecognized movement type supplied at the wire boundary.
    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn duplicate_sku(sku: impl Into<String>) -> Self {
        Self::DuplicateSku(sku.into())
    }

    pub fn invalid_movement_type(raw: impl Into<String>) -> Self {
        Self::InvalidMovementType(raw.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Stable machine-readable code for client UIs.
    ///
    /// These strings are part of the external contract; never rename them.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::DuplicateSku(_) => "duplicate_sku",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InsufficientAvailableStock { .. } => "insufficient_available_stock",
            Self::InvalidMovementType(_) => "invalid_movement_type",
            Self::InvalidId(_) => "invalid_id",
        }
    }
}
