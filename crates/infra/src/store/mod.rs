//! Stock storage abstraction.
//!
//! The store owns three tables worth of state: current item truth, the
//! append-only movement ledger, and alert rows. All three are mutated
//! together only inside [`StockStore::with_item_lock`], which is the
//! subsystem's single atomicity primitive.

use async_trait::async_trait;
use thiserror::Error;

use stockbook_core::{AlertId, DomainError, InventoryItemId};
use stockbook_inventory::{
    InventoryItem, NewAlert, NewMovement, StockAlert, StockMovement,
};

pub mod in_memory;
pub mod postgres;
pub mod query;

pub use in_memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use query::{
    AlertFilter, InventoryValuation, ItemFilter, ItemPage, MovementFilter, MovementPage,
    Pagination,
};

/// Infrastructure-level storage error.
///
/// Deterministic business failures never appear here; they travel as
/// [`DomainError`] through [`TxFailure`]. `is_transient()` marks the kinds a
/// caller may safely retry, which is always safe because a failed call never
/// commits partial state.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// Row-lock acquisition exceeded the configured bound.
    #[error("lock acquisition timed out: {0}")]
    LockTimeout(String),

    /// The transaction failed to begin, commit, or was aborted by the
    /// database (serialization failure, deadlock victim).
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Connection-level failure (pool closed, network).
    #[error("connection failure: {0}")]
    Connection(String),

    /// A unique constraint was violated (e.g. duplicate SKU at insert).
    #[error("unique constraint violated: {0}")]
    DuplicateKey(String),

    /// A stored row could not be decoded into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LockTimeout(_) | Self::Transaction(_) | Self::Connection(_)
        )
    }
}

/// Failure of a locked item transaction. Either the domain decision rejected
/// the change (business error, detected before any write) or the
/// infrastructure failed. Both roll the transaction back untouched.
#[derive(Debug, Error)]
pub enum TxFailure {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Effects a locked decision wants committed: the updated item row, at most
/// one ledger entry, and any alerts the threshold check raised. The store
/// persists all of them in the same transaction or none at all.
#[derive(Debug, Clone)]
pub struct TxEffects {
    pub item: InventoryItem,
    pub movement: Option<NewMovement>,
    pub new_alerts: Vec<NewAlert>,
}

impl TxEffects {
    /// Effects that only rewrite the item row (reservations, registry
    /// updates): no ledger entry, no alerts.
    pub fn item_only(item: InventoryItem) -> Self {
        Self {
            item,
            movement: None,
            new_alerts: Vec::new(),
        }
    }
}

/// What a committed locked transaction produced.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub item: InventoryItem,
    pub movement: Option<StockMovement>,
    pub raised_alerts: Vec<StockAlert>,
}

/// Pure decision logic run under the item lock. Receives the locked item and
/// its currently `ACTIVE` alerts; returns the effects to commit. Must not
/// perform IO.
pub type Decide =
    Box<dyn FnOnce(&InventoryItem, &[StockAlert]) -> Result<TxEffects, DomainError> + Send>;

/// Storage abstraction over items, movements, and alerts.
///
/// Two implementations ship with the engine: [`InMemoryStockStore`] for
/// tests and development, and [`PostgresStockStore`] for production. Both
/// provide the same serialization guarantee: all mutations of one item are
/// strictly ordered by an exclusive per-item lock.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Insert a freshly registered item. Fails with `DuplicateKey` when the
    /// SKU is already taken.
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem, StoreError>;

    /// Fetch an item by id, active or not. `None` when the row is missing.
    async fn get_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItem>, StoreError>;

    /// Fetch an item by SKU, active or not.
    async fn find_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>, StoreError>;

    /// Run `decide` under an exclusive lock on the item row and commit its
    /// effects atomically.
    ///
    /// Sequence: begin transaction, lock the row (bounded by the configured
    /// lock timeout), load the item's active alerts, call `decide`, persist
    /// the returned effects, commit. A `DomainError` from `decide` or any
    /// storage failure rolls everything back; the item, ledger, and alerts
    /// stay exactly as they were.
    ///
    /// Fails with `DomainError::NotFound` when the item is missing or
    /// inactive.
    async fn with_item_lock(
        &self,
        item_id: InventoryItemId,
        decide: Decide,
    ) -> Result<TxOutcome, TxFailure>;

    /// Full ledger for one item, in commit order (`created_at`, then id;
    /// movement ids are UUIDv7, so the tiebreak follows time too).
    async fn list_movements(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockMovement>, StoreError>;

    /// Filtered, paginated ledger readback for one item, in commit order.
    async fn movement_page(
        &self,
        item_id: InventoryItemId,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError>;

    async fn get_alert(&self, alert_id: AlertId) -> Result<Option<StockAlert>, StoreError>;

    /// Persist an updated alert row (acknowledgment). The row must exist.
    async fn save_alert(&self, alert: &StockAlert) -> Result<(), StoreError>;

    /// Alerts matching the filter, newest trigger first.
    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<StockAlert>, StoreError>;

    /// Active items whose reorder point is set and breached.
    async fn find_low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Active items with no stock on hand.
    async fn find_out_of_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Stock valuation over active items (see [`InventoryValuation`]).
    async fn valuation(&self) -> Result<InventoryValuation, StoreError>;

    /// Filtered, paginated item search, ordered by SKU.
    async fn search_items(
        &self,
        filter: ItemFilter,
        pagination: Pagination,
    ) -> Result<ItemPage, StoreError>;
}
