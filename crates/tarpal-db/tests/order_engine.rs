//! Order lifecycle through the public engine API.

mod common;

use common::{customer, db, db_with, product, stock_of};
use tarpal_core::{
    CoreError, CustomerTier, ItemReplacementStock, Money, OrderLine, OrderStatus,
    OverpaymentPolicy, PageRequest, PaymentKind, PaymentStatus, StockReason, TierPolicy,
    ValidationError, MAX_AMOUNT_CENTS,
};
use tarpal_db::{
    CreateOrder, CustomerUpdate, EngineConfig, EngineError, NewProduct, OrderFilter, UpdateOrder,
};

fn core(err: EngineError) -> CoreError {
    match err {
        EngineError::Core(e) => e,
        EngineError::Db(e) => panic!("expected a business error, got {e}"),
    }
}

#[tokio::test]
async fn test_create_order_prices_and_commits_stock() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;

    let created = db
        .order_engine()
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]).created_by("staff-1"))
        .await
        .unwrap();
    assert!(tarpal_core::order::is_order_code(&created.order_code));

    let details = db.orders().get_order_details(&created.id).await.unwrap().unwrap();
    let order = &details.order;
    assert_eq!(order.total_amount(), Money::from_major(300));
    assert_eq!(order.net_payable(), Money::from_major(300));
    assert_eq!(order.payment.payment_status, PaymentStatus::Unpaid);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].unit_price_cents, Money::from_major(100).cents());
    assert_eq!(details.items[0].product_name, "PE Tarpaulin");

    assert_eq!(stock_of(&db, &p).await, 7);
    let ledger = db.stock().for_order(&created.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].reason, StockReason::OrderFulfillment);
    assert_eq!((ledger[0].previous_stock, ledger[0].new_stock), (10, 7));
    assert_eq!(ledger[0].acting_user_id.as_deref(), Some("staff-1"));
}

#[tokio::test]
async fn test_two_payments_complete_the_order() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let first = engine
        .record_payment(&created.id, Money::from_major(150), Some("cashier".into()))
        .await
        .unwrap();
    assert_eq!(first.message, "Payment of ₹150.00 recorded successfully");
    assert_eq!(first.order.status, OrderStatus::Processing);
    assert_eq!(first.order.payment.payment_status, PaymentStatus::PartiallyPaid);
    assert_eq!(first.order.payment.balance_remaining(), Money::from_major(150));

    let second = engine
        .record_payment(&created.id, Money::from_major(150), None)
        .await
        .unwrap();
    assert_eq!(second.order.status, OrderStatus::Completed);
    assert_eq!(second.order.payment.payment_status, PaymentStatus::Paid);
    assert!(second.order.payment.balance_remaining().is_zero());

    let order = db.orders().get(&created.id).await.unwrap().unwrap();
    let statuses: Vec<OrderStatus> = order.status_history.iter().map(|h| h.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Pending, OrderStatus::Processing, OrderStatus::Completed]
    );

    let log = db.orders().payments(&created.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|p| p.kind == PaymentKind::Increment));
    assert_eq!(log[0].amount_paid_after_cents, Money::from_major(150).cents());
    assert_eq!(log[1].amount_paid_after_cents, Money::from_major(300).cents());
    assert_eq!(log[0].recorded_by.as_deref(), Some("cashier"));
}

#[tokio::test]
async fn test_failed_create_writes_nothing() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let plenty = product(&db, "PE Tarpaulin", 100, 80, 50).await;
    let scarce = product(&db, "Truck Cover", 3400, 3050, 1).await;

    let err = db
        .order_engine()
        .create_order(CreateOrder::new(
            &c,
            vec![OrderLine::new(&plenty, 5), OrderLine::new(&scarce, 2)],
        ))
        .await
        .unwrap_err();
    match core(err) {
        CoreError::InsufficientStock {
            product_name,
            available,
            requested,
            ..
        } => {
            assert_eq!(product_name, "Truck Cover");
            assert_eq!((available, requested), (1, 2));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(db.orders().count().await.unwrap(), 0);
    assert_eq!(stock_of(&db, &plenty).await, 50);
    // Only the opening stock entry.
    assert_eq!(db.stock().history(&plenty, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_customer_and_product() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();

    let err = engine
        .create_order(CreateOrder::new("missing", vec![OrderLine::new(&p, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::CustomerNotFound(_)));

    let err = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new("missing", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::ProductNotFound(_)));

    assert_eq!(stock_of(&db, &p).await, 10);
}

#[tokio::test]
async fn test_duplicate_lines_are_checked_on_summed_demand() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 5).await;

    let err = db
        .order_engine()
        .create_order(CreateOrder::new(
            &c,
            vec![OrderLine::new(&p, 3), OrderLine::new(&p, 3)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        core(err),
        CoreError::InsufficientStock { available: 5, requested: 6, .. }
    ));
    assert_eq!(stock_of(&db, &p).await, 5);
}

#[tokio::test]
async fn test_discount_cannot_exceed_total() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();

    let err = engine
        .create_order(
            CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]).discount(Money::from_major(400)),
        )
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::DiscountExceedsTotal { .. }));
    assert_eq!(stock_of(&db, &p).await, 10);

    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();
    let err = engine
        .update_order(
            &created.id,
            UpdateOrder {
                discount: Some(Money::from_major(301)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::DiscountExceedsTotal { .. }));
}

#[tokio::test]
async fn test_initial_payment_is_capped_at_net_payable() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;

    let created = db
        .order_engine()
        .create_order(
            CreateOrder::new(&c, vec![OrderLine::new(&p, 3)])
                .discount(Money::from_major(50))
                .amount_paid(Money::from_major(1000)),
        )
        .await
        .unwrap();

    let order = db.orders().get(&created.id).await.unwrap().unwrap();
    assert_eq!(order.net_payable(), Money::from_major(250));
    assert_eq!(order.payment.amount_paid(), Money::from_major(250));
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_overpayment_clamp_and_allow() {
    for (policy, paid, balance) in [
        (OverpaymentPolicy::Clamp, 300, 0),
        (OverpaymentPolicy::Allow, 500, -200),
    ] {
        let db = db_with(EngineConfig {
            overpayment: policy,
            ..Default::default()
        })
        .await;
        let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
        let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
        let engine = db.order_engine();
        let created = engine
            .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
            .await
            .unwrap();

        let receipt = engine
            .record_payment(&created.id, Money::from_major(500), None)
            .await
            .unwrap();
        assert_eq!(receipt.order.payment.amount_paid(), Money::from_major(paid));
        assert_eq!(
            receipt.order.payment.balance_remaining(),
            Money::from_major(balance)
        );
        assert_eq!(receipt.order.status, OrderStatus::Completed);
    }
}

#[tokio::test]
async fn test_tier_policy_on_item_replacement() {
    for (policy, expected_total) in [(TierPolicy::Snapshot, 200), (TierPolicy::Current, 160)] {
        let db = db_with(EngineConfig {
            tier_policy: policy,
            ..Default::default()
        })
        .await;
        let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
        let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
        let engine = db.order_engine();
        let created = engine
            .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 1)]))
            .await
            .unwrap();

        db.customers()
            .update(
                &c,
                CustomerUpdate {
                    tier: Some(CustomerTier::Wholesaler),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // The existing order keeps its price until its items are replaced.
        let before = db.orders().get(&created.id).await.unwrap().unwrap();
        assert_eq!(before.total_amount(), Money::from_major(100));

        let details = engine
            .update_order(
                &created.id,
                UpdateOrder {
                    items: Some(vec![OrderLine::new(&p, 2)]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(details.order.total_amount(), Money::from_major(expected_total));
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].quantity, 2);
    }
}

#[tokio::test]
async fn test_item_replacement_ignores_stock_by_default() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    engine
        .update_order(
            &created.id,
            UpdateOrder {
                items: Some(vec![OrderLine::new(&p, 5)]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(stock_of(&db, &p).await, 7);
}

#[tokio::test]
async fn test_item_replacement_reconciles_stock() {
    let db = db_with(EngineConfig {
        item_replacement_stock: ItemReplacementStock::Reconcile,
        ..Default::default()
    })
    .await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let replace = |qty: i64| UpdateOrder {
        items: Some(vec![OrderLine::new(&p, qty)]),
        ..Default::default()
    };

    engine.update_order(&created.id, replace(5), None).await.unwrap();
    assert_eq!(stock_of(&db, &p).await, 5);

    engine.update_order(&created.id, replace(1), None).await.unwrap();
    assert_eq!(stock_of(&db, &p).await, 9);

    let err = engine
        .update_order(&created.id, replace(20), None)
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::InsufficientStock { .. }));
    assert_eq!(stock_of(&db, &p).await, 9);

    let ledger = db.stock().for_order(&created.id).await.unwrap();
    let reasons: Vec<StockReason> = ledger.iter().map(|e| e.reason).collect();
    assert_eq!(
        reasons,
        vec![
            StockReason::OrderFulfillment,
            StockReason::ItemReplacement,
            StockReason::ItemReplacement,
        ]
    );
}

#[tokio::test]
async fn test_replacement_with_missing_product_rolls_back() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let err = engine
        .update_order(
            &created.id,
            UpdateOrder {
                items: Some(vec![OrderLine::new("missing", 1)]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::ProductNotFound(_)));

    let details = db.orders().get_order_details(&created.id).await.unwrap().unwrap();
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].product_id, p);
}

#[tokio::test]
async fn test_edit_overwrites_amount_paid_and_logs_it() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();
    engine
        .record_payment(&created.id, Money::from_major(100), None)
        .await
        .unwrap();

    let details = engine
        .update_order(
            &created.id,
            UpdateOrder {
                amount_paid: Some(Money::from_major(1000)),
                special_instructions: Some("Fold, do not roll".into()),
                ..Default::default()
            },
            Some("admin".into()),
        )
        .await
        .unwrap();
    let order = details.order;
    assert_eq!(order.payment.amount_paid(), Money::from_major(300));
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.special_instructions.as_deref(), Some("Fold, do not roll"));

    let log = db.orders().payments(&created.id).await.unwrap();
    let last = log.last().unwrap();
    assert_eq!(last.kind, PaymentKind::Overwrite);
    assert_eq!(last.amount_cents, Money::from_major(1000).cents());
    assert_eq!(last.amount_paid_after_cents, Money::from_major(300).cents());
    assert_eq!(last.recorded_by.as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_lowering_net_payable_clamps_amount_paid() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(
            CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]).amount_paid(Money::from_major(300)),
        )
        .await
        .unwrap();

    let details = engine
        .update_order(
            &created.id,
            UpdateOrder {
                discount: Some(Money::from_major(100)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let order = details.order;
    assert_eq!(order.net_payable(), Money::from_major(200));
    assert_eq!(order.payment.amount_paid(), Money::from_major(200));
    assert!(order.payment.balance_remaining().is_zero());
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_only_cancelled_can_be_requested() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let err = engine
        .update_order(
            &created.id,
            UpdateOrder {
                status: Some(OrderStatus::Completed),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::DerivedStatus(_)));

    let details = engine
        .update_order(
            &created.id,
            UpdateOrder {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(details.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_cancelled_order_is_closed() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let cancelled = engine.cancel_order(&created.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.status_history.len(), 2);
    // Stock is not returned on cancellation.
    assert_eq!(stock_of(&db, &p).await, 7);

    let err = engine
        .record_payment(&created.id, Money::from_major(10), None)
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::OrderClosed { .. }));

    let err = engine
        .update_order(
            &created.id,
            UpdateOrder {
                discount: Some(Money::from_major(10)),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::OrderClosed { .. }));

    let err = engine.cancel_order(&created.id).await.unwrap_err();
    assert!(matches!(core(err), CoreError::OrderClosed { .. }));
}

#[tokio::test]
async fn test_zero_payment_is_accepted() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();

    let receipt = engine
        .record_payment(&created.id, Money::zero(), None)
        .await
        .unwrap();
    assert_eq!(receipt.order.status, OrderStatus::Pending);
    assert_eq!(receipt.order.status_history.len(), 1);

    let err = engine
        .record_payment(&created.id, Money::from_cents(-1), None)
        .await
        .unwrap_err();
    assert!(matches!(core(err), CoreError::Validation(_)));
}

#[tokio::test]
async fn test_amounts_outside_money_range_are_rejected() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;

    let err = db
        .products()
        .create(NewProduct::new("Big", i64::MAX / 2, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        core(err),
        CoreError::Validation(ValidationError::OutOfRange { .. })
    ));

    // Priced at the ceiling: one unit fits, three overflow the line total.
    let dear = product(&db, "Pond Liner XL", MAX_AMOUNT_CENTS / 100, 1, 10).await;
    let engine = db.order_engine();
    let err = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&dear, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(
        core(err),
        CoreError::Validation(ValidationError::OutOfRange { .. })
    ));
    assert_eq!(stock_of(&db, &dear).await, 10);
    assert_eq!(db.orders().count().await.unwrap(), 0);

    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();
    engine
        .record_payment(&created.id, Money::from_major(150), None)
        .await
        .unwrap();

    let err = engine
        .record_payment(&created.id, Money::from_cents(i64::MAX), None)
        .await
        .unwrap_err();
    assert!(matches!(
        core(err),
        CoreError::Validation(ValidationError::OutOfRange { .. })
    ));

    let order = db.orders().get(&created.id).await.unwrap().unwrap();
    assert_eq!(order.payment.amount_paid(), Money::from_major(150));
    assert_eq!(order.payment.payment_status, PaymentStatus::PartiallyPaid);
    assert_eq!(db.orders().payments(&created.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_order_cascades() {
    let db = db().await;
    let c = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let engine = db.order_engine();
    let created = engine
        .create_order(CreateOrder::new(&c, vec![OrderLine::new(&p, 3)]))
        .await
        .unwrap();
    engine
        .record_payment(&created.id, Money::from_major(50), None)
        .await
        .unwrap();

    engine.delete_order(&created.id).await.unwrap();
    assert!(db.orders().get_order_details(&created.id).await.unwrap().is_none());
    assert!(db.orders().payments(&created.id).await.unwrap().is_empty());

    let err = engine.delete_order(&created.id).await.unwrap_err();
    assert!(matches!(core(err), CoreError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_list_orders_filters() {
    let db = db().await;
    let retailer = customer(&db, "Ravi Kumar", CustomerTier::Retailer).await;
    let wholesaler = customer(&db, "Sharma Traders", CustomerTier::Wholesaler).await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 100).await;
    let engine = db.order_engine();

    engine
        .create_order(CreateOrder::new(&retailer, vec![OrderLine::new(&p, 1)]))
        .await
        .unwrap();
    let paid = engine
        .create_order(
            CreateOrder::new(&wholesaler, vec![OrderLine::new(&p, 2)])
                .amount_paid(Money::from_major(60)),
        )
        .await
        .unwrap();

    let all = db
        .orders()
        .list_orders(&OrderFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    // Newest first by default.
    assert_eq!(all.items[0].order.id, paid.id);
    assert_eq!(all.items[0].customer_name, "Sharma Traders");

    let wholesale = OrderFilter {
        tier: Some(CustomerTier::Wholesaler),
        ..Default::default()
    };
    assert_eq!(
        db.orders().list_orders(&wholesale, PageRequest::default()).await.unwrap().total,
        1
    );

    let processing = OrderFilter {
        status: Some(OrderStatus::Processing),
        payment_status: Some(PaymentStatus::PartiallyPaid),
        ..Default::default()
    };
    let page = db.orders().list_orders(&processing, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].order.id, paid.id);

    let search = OrderFilter {
        customer_search: Some("ravi".into()),
        ..Default::default()
    };
    assert_eq!(
        db.orders().list_orders(&search, PageRequest::default()).await.unwrap().total,
        1
    );

    let recent = db.orders().recent_orders(1).await.unwrap();
    assert_eq!(recent.len(), 1);
}
