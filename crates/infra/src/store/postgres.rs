//! Postgres-backed stock store.
//!
//! Persists the three tables the engine owns (`inventory_items`,
//! `stock_movements`, `stock_alerts`) and implements the per-item
//! serialization contract with a pessimistic row lock: every mutation runs
//! as `BEGIN; SELECT ... FOR UPDATE; mutate; COMMIT` inside one
//! [`StockStore::with_item_lock`] call.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (lock not available) | `55P03` | `LockTimeout` | `lock_timeout` exceeded while waiting on a row lock |
//! | Database (unique violation) | `23505` | `DuplicateKey` | Duplicate SKU, or a second active alert of the same type |
//! | Database (serialization/deadlock) | `40001`, `40P01` | `Transaction` | Aborted by the database; safe to retry |
//! | Database (other) | Any other | `Transaction` | Constraint violations, unexpected database errors |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Connection` | Pool or network failure |
//! | ColumnDecode / Decode | N/A | `Corrupt` | Stored row does not decode into its domain type |
//!
//! ## Thread Safety
//!
//! `PostgresStockStore` is `Send + Sync` and cheap to clone; all operations
//! go through the SQLx connection pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockbook_core::{AlertId, DomainError, InventoryItemId};
use stockbook_inventory::{
    AlertStatus, AlertType, InventoryItem, MovementType, StockAlert, StockMovement,
};

use crate::config::StoreConfig;

use super::query::{
    AlertFilter, InventoryValuation, ItemFilter, ItemPage, MovementFilter, MovementPage,
    Pagination,
};
use super::{Decide, StockStore, StoreError, TxFailure, TxOutcome};

/// Idempotent schema bootstrap. The partial unique index on
/// `stock_alerts` backs the one-active-alert-per-(item, type) invariant at
/// the database level as well.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    id              UUID PRIMARY KEY,
    sku             TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    category        TEXT,
    supplier        TEXT,
    current_stock   BIGINT NOT NULL CHECK (current_stock >= 0),
    reserved_stock  BIGINT NOT NULL CHECK (reserved_stock >= 0),
    reorder_point   BIGINT,
    max_stock_level BIGINT,
    unit_cost       NUMERIC,
    selling_price   NUMERIC,
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    CHECK (reserved_stock <= current_stock)
);

CREATE TABLE IF NOT EXISTS stock_movements (
    id               UUID PRIMARY KEY,
    item_id          UUID NOT NULL REFERENCES inventory_items (id),
    movement_type    TEXT NOT NULL,
    quantity         BIGINT NOT NULL,
    previous_stock   BIGINT NOT NULL,
    new_stock        BIGINT NOT NULL,
    reference_number TEXT,
    notes            TEXT,
    user_id          UUID NOT NULL,
    ip_address       TEXT,
    created_at       TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stock_movements_item
    ON stock_movements (item_id, created_at, id);

CREATE TABLE IF NOT EXISTS stock_alerts (
    id              UUID PRIMARY KEY,
    item_id         UUID NOT NULL REFERENCES inventory_items (id),
    alert_type      TEXT NOT NULL,
    threshold_value BIGINT NOT NULL,
    status          TEXT NOT NULL,
    last_triggered  TIMESTAMPTZ NOT NULL,
    acknowledged_by UUID,
    acknowledged_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_active_alert_per_item_type
    ON stock_alerts (item_id, alert_type)
    WHERE status = 'ACTIVE';
"#;

const ITEM_COLUMNS: &str = r#"
    id, sku, name, category, supplier,
    current_stock, reserved_stock, reorder_point, max_stock_level,
    unit_cost, selling_price, is_active, created_at, updated_at
"#;

/// Postgres stock store. Clone shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }

    /// Connect a pool per the supplied config.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, config.lock_timeout))
    }

    /// Create the tables and indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(skip(self, item), fields(item_id = %item.id, sku = %item.sku), err)]
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, sku, name, category, supplier,
                current_stock, reserved_stock, reorder_point, max_stock_level,
                unit_cost, selling_price, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.supplier)
        .bind(item.current_stock)
        .bind(item.reserved_stock)
        .bind(item.reorder_point)
        .bind(item.max_stock_level)
        .bind(item.unit_cost)
        .bind(item.selling_price)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateKey(item.sku.clone())
            } else {
                map_sqlx_error("insert_item", e)
            }
        })?;

        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %item_id), err)]
    async fn get_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(item_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.map(|r| decode_item(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_item_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1"
        ))
        .bind(sku)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_item_by_sku", e))?;

        row.map(|r| decode_item(&r)).transpose()
    }

    #[instrument(skip(self, decide), fields(item_id = %item_id), err)]
    async fn with_item_lock(
        &self,
        item_id: InventoryItemId,
        decide: Decide,
    ) -> Result<TxOutcome, TxFailure> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TxFailure::Store(map_sqlx_error("begin_transaction", e)))?;

        // Bound the wait on the row lock; 55P03 surfaces as LockTimeout.
        // SET does not take bind parameters; the value comes from config,
        // not from callers.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = {}",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| TxFailure::Store(map_sqlx_error("set_lock_timeout", e)))?;

        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(item_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| TxFailure::Store(map_sqlx_error("lock_item", e)))?;

        let item = match row {
            Some(r) => decode_item(&r).map_err(TxFailure::Store)?,
            None => return Err(DomainError::not_found().into()),
        };
        if !item.is_active {
            return Err(DomainError::not_found().into());
        }

        let active_alerts = fetch_active_alerts(&mut tx, item_id).await?;

        let effects = decide(&item, &active_alerts)?;

        let now = Utc::now();
        let mut updated = effects.item;
        updated.updated_at = now;

        sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = $2,
                category = $3,
                supplier = $4,
                current_stock = $5,
                reserved_stock = $6,
                reorder_point = $7,
                max_stock_level = $8,
                unit_cost = $9,
                selling_price = $10,
                is_active = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(&updated.name)
        .bind(&updated.category)
        .bind(&updated.supplier)
        .bind(updated.current_stock)
        .bind(updated.reserved_stock)
        .bind(updated.reorder_point)
        .bind(updated.max_stock_level)
        .bind(updated.unit_cost)
        .bind(updated.selling_price)
        .bind(updated.is_active)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| TxFailure::Store(map_sqlx_error("update_item", e)))?;

        let movement = match effects.movement {
            Some(m) => {
                let movement = m.record(now);
                insert_movement(&mut tx, &movement).await?;
                Some(movement)
            }
            None => None,
        };

        let mut raised_alerts = Vec::with_capacity(effects.new_alerts.len());
        for new_alert in effects.new_alerts {
            let alert = new_alert.raise(now);
            insert_alert(&mut tx, &alert).await?;
            raised_alerts.push(alert);
        }

        tx.commit()
            .await
            .map_err(|e| TxFailure::Store(map_sqlx_error("commit_transaction", e)))?;

        Ok(TxOutcome {
            item: updated,
            movement,
            raised_alerts,
        })
    }

    #[instrument(skip(self), fields(item_id = %item_id), err)]
    async fn list_movements(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, item_id, movement_type, quantity, previous_stock, new_stock,
                reference_number, notes, user_id, ip_address, created_at
            FROM stock_movements
            WHERE item_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(item_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter().map(decode_movement).collect()
    }

    #[instrument(skip(self, filter), fields(item_id = %item_id), err)]
    async fn movement_page(
        &self,
        item_id: InventoryItemId,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        let type_param: Option<&str> = filter.movement_type.map(|mt| mt.as_str());

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM stock_movements
            WHERE item_id = $1
                AND ($2::text IS NULL OR movement_type = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at <= $4)
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(type_param)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_movements", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(
            r#"
            SELECT
                id, item_id, movement_type, quantity, previous_stock, new_stock,
                reference_number, notes, user_id, ip_address, created_at
            FROM stock_movements
            WHERE item_id = $1
                AND ($2::text IS NULL OR movement_type = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at ASC, id ASC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(type_param)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_page", e))?;

        let movements = rows
            .iter()
            .map(decode_movement)
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = total > (pagination.offset + pagination.limit) as i64;

        Ok(MovementPage {
            movements,
            total: total as u64,
            pagination,
            has_more,
        })
    }

    #[instrument(skip(self), fields(alert_id = %alert_id), err)]
    async fn get_alert(&self, alert_id: AlertId) -> Result<Option<StockAlert>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, item_id, alert_type, threshold_value, status,
                   last_triggered, acknowledged_by, acknowledged_at
            FROM stock_alerts
            WHERE id = $1
            "#,
        )
        .bind(alert_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_alert", e))?;

        row.map(|r| decode_alert(&r)).transpose()
    }

    #[instrument(skip(self, alert), fields(alert_id = %alert.id), err)]
    async fn save_alert(&self, alert: &StockAlert) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_alerts SET
                threshold_value = $2,
                status = $3,
                last_triggered = $4,
                acknowledged_by = $5,
                acknowledged_at = $6
            WHERE id = $1
            "#,
        )
        .bind(alert.id.as_uuid())
        .bind(alert.threshold_value)
        .bind(alert.status.as_str())
        .bind(alert.last_triggered)
        .bind(alert.acknowledged_by.map(|u| *u.as_uuid()))
        .bind(alert.acknowledged_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_alert", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "alert {} does not exist",
                alert.id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, filter), err)]
    async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<StockAlert>, StoreError> {
        let item_param = filter.item_id.map(|id| *id.as_uuid());
        let type_param: Option<&str> = filter.alert_type.map(|t| t.as_str());
        let status_param: Option<&str> = filter.status.map(|s| s.as_str());

        let rows = sqlx::query(
            r#"
            SELECT id, item_id, alert_type, threshold_value, status,
                   last_triggered, acknowledged_by, acknowledged_at
            FROM stock_alerts
            WHERE ($1::uuid IS NULL OR item_id = $1)
                AND ($2::text IS NULL OR alert_type = $2)
                AND ($3::text IS NULL OR status = $3)
            ORDER BY last_triggered DESC, id ASC
            "#,
        )
        .bind(item_param)
        .bind(type_param)
        .bind(status_param)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_alerts", e))?;

        rows.iter().map(decode_alert).collect()
    }

    #[instrument(skip(self), err)]
    async fn find_low_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM inventory_items
            WHERE is_active
                AND reorder_point IS NOT NULL
                AND current_stock <= reorder_point
            ORDER BY sku ASC
            "#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_low_stock_items", e))?;

        rows.iter().map(decode_item).collect()
    }

    #[instrument(skip(self), err)]
    async fn find_out_of_stock_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM inventory_items
            WHERE is_active AND current_stock <= 0
            ORDER BY sku ASC
            "#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_out_of_stock_items", e))?;

        rows.iter().map(decode_item).collect()
    }

    #[instrument(skip(self), err)]
    async fn valuation(&self) -> Result<InventoryValuation, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(current_stock * unit_cost)
                         FILTER (WHERE unit_cost IS NOT NULL), 0) AS total_value,
                COALESCE(SUM(current_stock), 0)::BIGINT AS total_units,
                COUNT(*) AS item_count
            FROM inventory_items
            WHERE is_active
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("valuation", e))?;

        let total_value: Decimal = row
            .try_get("total_value")
            .map_err(|e| StoreError::Corrupt(format!("failed to read total_value: {e}")))?;
        let total_units: i64 = row
            .try_get("total_units")
            .map_err(|e| StoreError::Corrupt(format!("failed to read total_units: {e}")))?;
        let item_count: i64 = row
            .try_get("item_count")
            .map_err(|e| StoreError::Corrupt(format!("failed to read item_count: {e}")))?;

        Ok(InventoryValuation {
            total_value,
            total_units,
            item_count: item_count as u64,
        })
    }

    #[instrument(skip(self, filter), err)]
    async fn search_items(
        &self,
        filter: ItemFilter,
        pagination: Pagination,
    ) -> Result<ItemPage, StoreError> {
        let search_param: Option<String> = filter.search.clone();
        let category_param: Option<&str> = filter.category.as_deref();
        let supplier_param: Option<&str> = filter.supplier.as_deref();

        const CONDITIONS: &str = r#"
                ($1::text IS NULL OR sku ILIKE '%' || $1 || '%' OR name ILIKE '%' || $1 || '%')
                AND ($2::text IS NULL OR category = $2)
                AND ($3::text IS NULL OR supplier = $3)
                AND ($4::boolean IS NULL
                     OR (reorder_point IS NOT NULL AND current_stock <= reorder_point) = $4)
                AND ($5::boolean IS NULL OR (current_stock <= 0) = $5)
                AND (is_active OR $6)
        "#;

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM inventory_items WHERE {CONDITIONS}"
        ))
        .bind(&search_param)
        .bind(category_param)
        .bind(supplier_param)
        .bind(filter.low_stock)
        .bind(filter.out_of_stock)
        .bind(filter.include_inactive)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_items", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM inventory_items
            WHERE {CONDITIONS}
            ORDER BY sku ASC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(&search_param)
        .bind(category_param)
        .bind(supplier_param)
        .bind(filter.low_stock)
        .bind(filter.out_of_stock)
        .bind(filter.include_inactive)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_items", e))?;

        let items = rows.iter().map(decode_item).collect::<Result<Vec<_>, _>>()?;
        let has_more = total > (pagination.offset + pagination.limit) as i64;

        Ok(ItemPage {
            items,
            total: total as u64,
            pagination,
            has_more,
        })
    }
}

async fn fetch_active_alerts(
    tx: &mut Transaction<'_, Postgres>,
    item_id: InventoryItemId,
) -> Result<Vec<StockAlert>, TxFailure> {
    let rows = sqlx::query(
        r#"
        SELECT id, item_id, alert_type, threshold_value, status,
               last_triggered, acknowledged_by, acknowledged_at
        FROM stock_alerts
        WHERE item_id = $1 AND status = 'ACTIVE'
        "#,
    )
    .bind(item_id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| TxFailure::Store(map_sqlx_error("fetch_active_alerts", e)))?;

    rows.iter()
        .map(decode_alert)
        .collect::<Result<Vec<_>, _>>()
        .map_err(TxFailure::Store)
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    movement: &StockMovement,
) -> Result<(), TxFailure> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, item_id, movement_type, quantity, previous_stock, new_stock,
            reference_number, notes, user_id, ip_address, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(movement.id.as_uuid())
    .bind(movement.item_id.as_uuid())
    .bind(movement.movement_type.as_str())
    .bind(movement.quantity)
    .bind(movement.previous_stock)
    .bind(movement.new_stock)
    .bind(&movement.reference_number)
    .bind(&movement.notes)
    .bind(movement.user_id.as_uuid())
    .bind(&movement.ip_address)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| TxFailure::Store(map_sqlx_error("insert_movement", e)))?;
    Ok(())
}

async fn insert_alert(
    tx: &mut Transaction<'_, Postgres>,
    alert: &StockAlert,
) -> Result<(), TxFailure> {
    sqlx::query(
        r#"
        INSERT INTO stock_alerts (
            id, item_id, alert_type, threshold_value, status,
            last_triggered, acknowledged_by, acknowledged_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(alert.id.as_uuid())
    .bind(alert.item_id.as_uuid())
    .bind(alert.alert_type.as_str())
    .bind(alert.threshold_value)
    .bind(alert.status.as_str())
    .bind(alert.last_triggered)
    .bind(alert.acknowledged_by.map(|u| *u.as_uuid()))
    .bind(alert.acknowledged_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| TxFailure::Store(map_sqlx_error("insert_alert", e)))?;
    Ok(())
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    sku: String,
    name: String,
    category: Option<String>,
    supplier: Option<String>,
    current_stock: i64,
    reserved_stock: i64,
    reorder_point: Option<i64>,
    max_stock_level: Option<i64>,
    unit_cost: Option<Decimal>,
    selling_price: Option<Decimal>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            supplier: row.try_get("supplier")?,
            current_stock: row.try_get("current_stock")?,
            reserved_stock: row.try_get("reserved_stock")?,
            reorder_point: row.try_get("reorder_point")?,
            max_stock_level: row.try_get("max_stock_level")?,
            unit_cost: row.try_get("unit_cost")?,
            selling_price: row.try_get("selling_price")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn decode_item(row: &sqlx::postgres::PgRow) -> Result<InventoryItem, StoreError> {
    let r = ItemRow::from_row(row)
        .map_err(|e| StoreError::Corrupt(format!("failed to decode item row: {e}")))?;
    Ok(InventoryItem {
        id: InventoryItemId::from_uuid(r.id),
        sku: r.sku,
        name: r.name,
        category: r.category,
        supplier: r.supplier,
        current_stock: r.current_stock,
        reserved_stock: r.reserved_stock,
        reorder_point: r.reorder_point,
        max_stock_level: r.max_stock_level,
        unit_cost: r.unit_cost,
        selling_price: r.selling_price,
        is_active: r.is_active,
        created_at: r.created_at,
        updated_at: r.updated_at,
    })
}

fn decode_movement(row: &sqlx::postgres::PgRow) -> Result<StockMovement, StoreError> {
    let movement_type_raw: String = row
        .try_get("movement_type")
        .map_err(|e| StoreError::Corrupt(format!("failed to decode movement row: {e}")))?;
    let movement_type: MovementType = movement_type_raw
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown movement type: {movement_type_raw}")))?;

    let read = |e: sqlx::Error| StoreError::Corrupt(format!("failed to decode movement row: {e}"));

    Ok(StockMovement {
        id: stockbook_core::MovementId::from_uuid(row.try_get("id").map_err(read)?),
        item_id: InventoryItemId::from_uuid(row.try_get("item_id").map_err(read)?),
        movement_type,
        quantity: row.try_get("quantity").map_err(read)?,
        previous_stock: row.try_get("previous_stock").map_err(read)?,
        new_stock: row.try_get("new_stock").map_err(read)?,
        reference_number: row.try_get("reference_number").map_err(read)?,
        notes: row.try_get("notes").map_err(read)?,
        user_id: stockbook_core::UserId::from_uuid(row.try_get("user_id").map_err(read)?),
        ip_address: row.try_get("ip_address").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
    })
}

fn decode_alert(row: &sqlx::postgres::PgRow) -> Result<StockAlert, StoreError> {
    let read = |e: sqlx::Error| StoreError::Corrupt(format!("failed to decode alert row: {e}"));

    let alert_type_raw: String = row.try_get("alert_type").map_err(read)?;
    let alert_type = match alert_type_raw.as_str() {
        "LOW_STOCK" => AlertType::LowStock,
        "OUT_OF_STOCK" => AlertType::OutOfStock,
        "OVERSTOCK" => AlertType::Overstock,
        "EXPIRY_WARNING" => AlertType::ExpiryWarning,
        other => {
            return Err(StoreError::Corrupt(format!("unknown alert type: {other}")));
        }
    };

    let status_raw: String = row.try_get("status").map_err(read)?;
    let status = match status_raw.as_str() {
        "ACTIVE" => AlertStatus::Active,
        "ACKNOWLEDGED" => AlertStatus::Acknowledged,
        "RESOLVED" => AlertStatus::Resolved,
        other => {
            return Err(StoreError::Corrupt(format!("unknown alert status: {other}")));
        }
    };

    Ok(StockAlert {
        id: AlertId::from_uuid(row.try_get("id").map_err(read)?),
        item_id: InventoryItemId::from_uuid(row.try_get("item_id").map_err(read)?),
        alert_type,
        threshold_value: row.try_get("threshold_value").map_err(read)?,
        status,
        last_triggered: row.try_get("last_triggered").map_err(read)?,
        acknowledged_by: row
            .try_get::<Option<uuid::Uuid>, _>("acknowledged_by")
            .map_err(read)?
            .map(stockbook_core::UserId::from_uuid),
        acknowledged_at: row.try_get("acknowledged_at").map_err(read)?,
    })
}

/// Map SQLx errors to StoreError (see the module-level table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("55P03") => StoreError::LockTimeout(msg),
                Some("23505") => StoreError::DuplicateKey(msg),
                Some("40001") | Some("40P01") => StoreError::Transaction(msg),
                _ => StoreError::Transaction(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Connection(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Connection(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Connection(format!("io error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { index, source } => StoreError::Corrupt(format!(
            "column decode failed in {operation} at {index}: {source}"
        )),
        sqlx::Error::Decode(e) => {
            StoreError::Corrupt(format!("decode failed in {operation}: {e}"))
        }
        _ => StoreError::Transaction(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
