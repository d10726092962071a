//! Stock ledger: guarded movements and the append-only history.

mod common;

use common::{db, product, stock_of};
use tarpal_core::{CoreError, StockAction, StockReason};
use tarpal_db::{EngineError, StockMovement};

#[tokio::test]
async fn test_reduce_below_zero_is_refused() {
    let db = db().await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;

    let err = db
        .stock()
        .adjust_stock(&p, StockAction::Reduce, 20, None, Some("storekeeper".into()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStockToReduce { available: 10, requested: 20, .. })
    ));

    assert_eq!(stock_of(&db, &p).await, 10);
    let history = db.stock().history(&p, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].remarks.as_deref(), Some("Initial stock"));
}

#[tokio::test]
async fn test_adjustments_are_recorded_newest_first() {
    let db = db().await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let ledger = db.stock();

    ledger
        .adjust_stock(&p, StockAction::Add, 15, Some("new batch".into()), Some("u-1".into()))
        .await
        .unwrap();
    let entry = ledger
        .adjust_stock(&p, StockAction::Reduce, 5, Some("damaged".into()), None)
        .await
        .unwrap();
    assert_eq!((entry.previous_stock, entry.new_stock), (25, 20));
    assert_eq!(entry.reason, StockReason::Adjustment);
    assert!(entry.reference_id.is_none());

    assert_eq!(stock_of(&db, &p).await, 20);
    let history = ledger.history(&p, 10).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].remarks.as_deref(), Some("damaged"));
    assert_eq!(history[1].acting_user_id.as_deref(), Some("u-1"));

    let recent = ledger.recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_movement_validation() {
    let db = db().await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;
    let ledger = db.stock();

    let err = ledger
        .apply(StockMovement::adjustment(&p, StockAction::Add, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));

    let err = ledger
        .apply(StockMovement::adjustment("missing", StockAction::Add, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::ProductNotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reductions_never_oversell() {
    let db = db().await;
    let p = product(&db, "PE Tarpaulin", 100, 80, 10).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let p = p.clone();
        handles.push(tokio::spawn(async move {
            db.stock()
                .adjust_stock(&p, StockAction::Reduce, 3, None, None)
                .await
                .is_ok()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(stock_of(&db, &p).await, 1);
    // Opening stock plus one row per successful reduction.
    assert_eq!(db.stock().history(&p, 20).await.unwrap().len(), 4);
}
