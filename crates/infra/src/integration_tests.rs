//! Integration tests for the full adjustment pipeline against the
//! in-memory store.
//!
//! Verifies the subsystem's contract end to end:
//! - movement-type arithmetic and the updated item returned to callers
//! - exactly one ledger row per adjustment, chained previous/new snapshots
//! - alert raising + deduplication inside the adjustment transaction
//! - atomicity: failed adjustments leave item, ledger, and alerts untouched
//! - serialization of concurrent adjustments against one item

#[cfg(test)]
mod tests {
    use stockbook_core::{DomainError, InventoryItemId, UserId};
    use stockbook_inventory::{
        AlertStatus, AlertType, ItemUpdate, MovementType, NewInventoryItem,
    };

    use crate::service::{
        AdjustStock, AdjustmentService, AlertService, InventoryError, InventoryReports,
        ItemRegistry,
    };
    use crate::store::{
        AlertFilter, InMemoryStockStore, ItemFilter, MovementFilter, Pagination, StockStore,
    };

    struct Harness {
        store: InMemoryStockStore,
        registry: ItemRegistry<InMemoryStockStore>,
        adjustments: AdjustmentService<InMemoryStockStore>,
        alerts: AlertService<InMemoryStockStore>,
        reports: InventoryReports<InMemoryStockStore>,
    }

    fn setup() -> Harness {
        stockbook_observability::init();
        let store = InMemoryStockStore::new();
        Harness {
            registry: ItemRegistry::new(store.clone()),
            adjustments: AdjustmentService::new(store.clone()),
            alerts: AlertService::new(store.clone()),
            reports: InventoryReports::new(store.clone()),
            store,
        }
    }

    fn test_user() -> UserId {
        UserId::new()
    }

    async fn register_item(
        h: &Harness,
        sku: &str,
        stock: i64,
        reorder_point: Option<i64>,
    ) -> InventoryItemId {
        let mut new = NewInventoryItem::new(sku, format!("Item {sku}"));
        new.initial_stock = stock;
        new.reorder_point = reorder_point;
        h.registry.register(new).await.unwrap().id
    }

    fn issue(quantity: i64) -> AdjustStock {
        AdjustStock::new(MovementType::Issue, quantity, test_user())
    }

    fn receipt(quantity: i64) -> AdjustStock {
        AdjustStock::new(MovementType::Receipt, quantity, test_user())
    }

    #[tokio::test]
    async fn issue_below_reorder_point_updates_ledger_and_raises_alert() {
        let h = setup();
        let item_id = register_item(&h, "ABC", 10, Some(5)).await;

        let item = h.adjustments.adjust_stock(item_id, issue(6)).await.unwrap();
        assert_eq!(item.current_stock, 4);

        let movements = h.reports.movements(item_id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].previous_stock, 10);
        assert_eq!(movements[0].new_stock, 4);
        assert_eq!(movements[0].movement_type, MovementType::Issue);

        let active = h.alerts.active_low_stock().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].item_id, item_id);
        assert_eq!(active[0].threshold_value, 5);

        // A second issue that overdraws fails and changes nothing.
        let err = h
            .adjustments
            .adjust_stock(item_id, issue(10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::InsufficientStock { requested: 10, available: 4 })
        ));
        let item = h.registry.get(item_id).await.unwrap();
        assert_eq!(item.current_stock, 4);
    }

    #[tokio::test]
    async fn reservations_respect_available_stock() {
        let h = setup();
        let item_id = register_item(&h, "RES", 4, None).await;

        let item = h.adjustments.reserve_stock(item_id, 3).await.unwrap();
        assert_eq!(item.reserved_stock, 3);
        assert_eq!(item.available_stock(), 1);

        let err = h.adjustments.reserve_stock(item_id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::InsufficientAvailableStock {
                requested: 2,
                available: 1,
            })
        ));
    }

    #[tokio::test]
    async fn release_floors_at_zero() {
        let h = setup();
        let item_id = register_item(&h, "REL", 10, None).await;

        h.adjustments.reserve_stock(item_id, 2).await.unwrap();
        let item = h
            .adjustments
            .release_reserved_stock(item_id, 5)
            .await
            .unwrap();
        assert_eq!(item.reserved_stock, 0);
    }

    #[tokio::test]
    async fn reservations_write_no_ledger_and_raise_no_alerts() {
        let h = setup();
        // Reserving the whole stock leaves current_stock above the reorder
        // point untouched, and must not trigger anything.
        let item_id = register_item(&h, "SOFT", 10, Some(5)).await;

        h.adjustments.reserve_stock(item_id, 10).await.unwrap();
        h.adjustments
            .release_reserved_stock(item_id, 4)
            .await
            .unwrap();

        assert!(h.reports.movements(item_id).await.unwrap().is_empty());
        let alerts = h.alerts.list(AlertFilter::default()).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn ledger_replay_reconciles_to_current_stock() {
        let h = setup();
        let initial = 20;
        let item_id = register_item(&h, "LEDGER", initial, None).await;

        let requests = vec![
            receipt(30),
            issue(10),
            AdjustStock::new(MovementType::Adjustment, 25, test_user()),
            AdjustStock::new(MovementType::Return, 5, test_user()),
            AdjustStock::new(MovementType::Damage, 3, test_user()),
            AdjustStock::new(MovementType::TransferOut, 7, test_user()),
            AdjustStock::new(MovementType::TransferIn, 12, test_user()),
            AdjustStock::new(MovementType::Expired, 1, test_user()),
        ];
        for request in requests {
            h.adjustments.adjust_stock(item_id, request).await.unwrap();
        }

        let item = h.registry.get(item_id).await.unwrap();
        let movements = h.reports.movements(item_id).await.unwrap();
        assert_eq!(movements.len(), 8);

        // Replaying the ledger in commit order reproduces current stock.
        let mut expected = initial;
        for (n, movement) in movements.iter().enumerate() {
            assert_eq!(
                movement.previous_stock, expected,
                "movement {n} does not chain"
            );
            assert_eq!(
                movement.new_stock,
                movement
                    .movement_type
                    .apply_to(movement.previous_stock, movement.quantity)
                    .unwrap()
            );
            expected = movement.new_stock;
        }
        assert_eq!(expected, item.current_stock);
    }

    #[tokio::test]
    async fn each_adjustment_writes_exactly_one_movement() {
        let h = setup();
        let item_id = register_item(&h, "ONE", 100, None).await;

        for n in 1..=5i64 {
            h.adjustments
                .adjust_stock(item_id, issue(n))
                .await
                .unwrap();
            let movements = h.reports.movements(item_id).await.unwrap();
            assert_eq!(
                movements.len() as i64,
                n,
                "expected one ledger row per adjustment call"
            );
        }
    }

    #[tokio::test]
    async fn repeated_breaches_keep_a_single_active_alert() {
        let h = setup();
        let item_id = register_item(&h, "DEDUP", 10, Some(8)).await;

        for _ in 0..4 {
            h.adjustments.adjust_stock(item_id, issue(1)).await.unwrap();
        }

        let active = h
            .alerts
            .list(AlertFilter::active(AlertType::LowStock))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn failed_adjustment_commits_nothing() {
        let h = setup();
        let item_id = register_item(&h, "ATOMIC", 10, Some(20)).await;
        h.adjustments.adjust_stock(item_id, issue(2)).await.unwrap();

        let item_before = h.registry.get(item_id).await.unwrap();
        let movements_before = h.reports.movements(item_id).await.unwrap().len();
        let alerts_before = h.alerts.list(AlertFilter::default()).await.unwrap().len();

        let err = h
            .adjustments
            .adjust_stock(item_id, issue(1000))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "insufficient_stock");

        assert_eq!(h.registry.get(item_id).await.unwrap(), item_before);
        assert_eq!(
            h.reports.movements(item_id).await.unwrap().len(),
            movements_before
        );
        assert_eq!(
            h.alerts.list(AlertFilter::default()).await.unwrap().len(),
            alerts_before
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_issues_serialize_without_lost_updates() {
        let h = setup();
        let quantity = 25;
        let item_id = register_item(&h, "RACE", 2 * quantity, None).await;

        let svc_a = AdjustmentService::new(h.store.clone());
        let svc_b = AdjustmentService::new(h.store.clone());
        let a = tokio::spawn(async move { svc_a.adjust_stock(item_id, issue(quantity)).await });
        let b = tokio::spawn(async move { svc_b.adjust_stock(item_id, issue(quantity)).await });

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let item = h.registry.get(item_id).await.unwrap();
        assert_eq!(item.current_stock, 0);

        // Two ledger rows whose snapshots chain: no lost update.
        let movements = h.reports.movements(item_id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].previous_stock, 2 * quantity);
        assert_eq!(movements[0].new_stock, quantity);
        assert_eq!(movements[1].previous_stock, quantity);
        assert_eq!(movements[1].new_stock, 0);

        // Hitting zero raised a single out-of-stock alert.
        let active = h.alerts.active_out_of_stock().await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn adjustment_movement_sets_an_absolute_level() {
        let h = setup();
        let item_id = register_item(&h, "RECON", 10, None).await;

        let item = h
            .adjustments
            .adjust_stock(
                item_id,
                AdjustStock::new(MovementType::Adjustment, 3, test_user()),
            )
            .await
            .unwrap();
        assert_eq!(item.current_stock, 3);

        let movements = h.reports.movements(item_id).await.unwrap();
        assert_eq!(movements[0].previous_stock, 10);
        assert_eq!(movements[0].new_stock, 3);
        assert_eq!(movements[0].quantity, 3);
    }

    #[tokio::test]
    async fn missing_or_inactive_items_are_not_found() {
        let h = setup();

        let err = h
            .adjustments
            .adjust_stock(InventoryItemId::new(), issue(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::NotFound)
        ));

        let item_id = register_item(&h, "GONE", 10, None).await;
        h.registry.deactivate(item_id).await.unwrap();
        let err = h
            .adjustments
            .adjust_stock(item_id, issue(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::NotFound)
        ));

        // The row itself survives the soft delete.
        let item = h.registry.get(item_id).await.unwrap();
        assert!(!item.is_active);
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let h = setup();
        register_item(&h, "DUP", 1, None).await;

        let err = h
            .registry
            .register(NewInventoryItem::new("DUP", "Imposter"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::DuplicateSku(ref sku)) if sku == "DUP"
        ));
    }

    #[tokio::test]
    async fn outbound_movements_cannot_consume_reserved_stock() {
        let h = setup();
        let item_id = register_item(&h, "HOLD", 10, None).await;
        h.adjustments.reserve_stock(item_id, 8).await.unwrap();

        // Only 2 are free to leave; issuing 5 would break
        // reserved <= current.
        let err = h
            .adjustments
            .adjust_stock(item_id, issue(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::InsufficientStock { available: 2, .. })
        ));

        h.adjustments.adjust_stock(item_id, issue(2)).await.unwrap();
        let item = h.registry.get(item_id).await.unwrap();
        assert_eq!(item.current_stock, 8);
        assert_eq!(item.reserved_stock, 8);
    }

    #[tokio::test]
    async fn acknowledged_alerts_record_the_actor_and_allow_a_new_cycle() {
        let h = setup();
        let item_id = register_item(&h, "ACK", 10, Some(9)).await;
        h.adjustments.adjust_stock(item_id, issue(2)).await.unwrap();

        let active = h.alerts.active_low_stock().await.unwrap();
        let operator = test_user();
        let acked = h
            .alerts
            .acknowledge(active[0].id, operator)
            .await
            .unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by, Some(operator));
        assert!(acked.acknowledged_at.is_some());

        // With no active row left, the next breach opens a fresh alert.
        h.adjustments.adjust_stock(item_id, issue(1)).await.unwrap();
        let active = h.alerts.active_low_stock().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, acked.id);
    }

    #[tokio::test]
    async fn acknowledging_an_unknown_alert_is_not_found() {
        let h = setup();
        let err = h
            .alerts
            .acknowledge(stockbook_core::AlertId::new(), test_user())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Domain(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn valuation_covers_active_items_only() {
        let h = setup();
        let cheap = {
            let mut new = NewInventoryItem::new("VAL-1", "Cheap");
            new.initial_stock = 10;
            new.unit_cost = Some("2.50".parse().unwrap());
            h.registry.register(new).await.unwrap().id
        };
        {
            let mut new = NewInventoryItem::new("VAL-2", "Dear");
            new.initial_stock = 3;
            new.unit_cost = Some("100".parse().unwrap());
            h.registry.register(new).await.unwrap();
        }
        // No unit cost: counted, not valued.
        let mut new = NewInventoryItem::new("VAL-3", "Unknown cost");
        new.initial_stock = 7;
        h.registry.register(new).await.unwrap();

        let valuation = h.reports.valuation().await.unwrap();
        assert_eq!(valuation.total_value, "325".parse().unwrap());
        assert_eq!(valuation.total_units, 20);
        assert_eq!(valuation.item_count, 3);

        // Soft-deleted items drop out of the report.
        h.registry.deactivate(cheap).await.unwrap();
        let valuation = h.reports.valuation().await.unwrap();
        assert_eq!(valuation.total_value, "300".parse().unwrap());
        assert_eq!(valuation.total_units, 10);
        assert_eq!(valuation.item_count, 2);
    }

    #[tokio::test]
    async fn stock_level_reports_filter_on_active_items() {
        let h = setup();
        register_item(&h, "OK", 50, Some(5)).await;
        register_item(&h, "LOW", 3, Some(5)).await;
        let empty = register_item(&h, "EMPTY", 0, None).await;
        let hidden = register_item(&h, "HIDDEN", 0, Some(5)).await;
        h.registry.deactivate(hidden).await.unwrap();

        let low = h.reports.low_stock_items().await.unwrap();
        assert_eq!(
            low.iter().map(|i| i.sku.as_str()).collect::<Vec<_>>(),
            vec!["LOW"]
        );

        let out = h.reports.out_of_stock_items().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, empty);
    }

    #[tokio::test]
    async fn search_composes_predicates_and_paginates() {
        let h = setup();
        for n in 0..5 {
            let mut new = NewInventoryItem::new(format!("WID-{n}"), format!("Widget {n}"));
            new.initial_stock = 10 * n;
            new.category = Some("widgets".to_string());
            h.registry.register(new).await.unwrap();
        }
        let mut new = NewInventoryItem::new("GAD-0", "Gadget");
        new.category = Some("gadgets".to_string());
        h.registry.register(new).await.unwrap();

        // Substring match is case-insensitive over sku and name.
        let page = h
            .reports
            .search(
                ItemFilter {
                    search: Some("wid".to_string()),
                    ..ItemFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);

        let page = h
            .reports
            .search(
                ItemFilter {
                    category: Some("gadgets".to_string()),
                    ..ItemFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].sku, "GAD-0");

        // Out-of-stock flag: WID-0 and GAD-0 both sit at zero.
        let page = h
            .reports
            .search(
                ItemFilter {
                    out_of_stock: Some(true),
                    ..ItemFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        // Pagination window with has_more.
        let page = h
            .reports
            .search(
                ItemFilter::default(),
                Pagination { limit: 4, offset: 0 },
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.total, 6);
        assert!(page.has_more);

        let page = h
            .reports
            .search(
                ItemFilter::default(),
                Pagination { limit: 4, offset: 4 },
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn movement_history_filters_by_type() {
        let h = setup();
        let item_id = register_item(&h, "HIST", 100, None).await;
        h.adjustments.adjust_stock(item_id, issue(5)).await.unwrap();
        h.adjustments
            .adjust_stock(item_id, receipt(20))
            .await
            .unwrap();
        h.adjustments.adjust_stock(item_id, issue(1)).await.unwrap();

        let page = h
            .reports
            .movement_history(
                item_id,
                MovementFilter {
                    movement_type: Some(MovementType::Issue),
                    ..MovementFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page
            .movements
            .iter()
            .all(|m| m.movement_type == MovementType::Issue));
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn registry_updates_do_not_touch_stock() {
        let h = setup();
        let item_id = register_item(&h, "UPD", 10, None).await;
        h.adjustments.reserve_stock(item_id, 4).await.unwrap();

        let updated = h
            .registry
            .update(
                item_id,
                ItemUpdate {
                    name: Some("Renamed".to_string()),
                    reorder_point: Some(3),
                    ..ItemUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.reorder_point, Some(3));
        assert_eq!(updated.current_stock, 10);
        assert_eq!(updated.reserved_stock, 4);
        assert!(h.reports.movements(item_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_get_returns_none_for_unknown_items() {
        let h = setup();
        assert!(h
            .store
            .get_item(InventoryItemId::new())
            .await
            .unwrap()
            .is_none());
        assert!(h.store.find_item_by_sku("NOPE").await.unwrap().is_none());
    }
}
