mod common;

use order_saga::ledger::{self, LedgerError};
use order_saga::models::OrderStatus;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn find_by_id_with_items_returns_consistent_snapshot() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id)
        .await
        .unwrap()
        .expect("aggregate should exist");
    tx.commit().await.unwrap();

    assert_eq!(aggregate.ledger.status, OrderStatus::Authorized);
    assert_eq!(aggregate.items.len(), 1);
    assert_eq!(aggregate.items[0].quantity, 2);
    assert_eq!(aggregate.items[0].unit_price_cents, 1000);

    common::cleanup_aggregate(&pool, id).await;
}

#[tokio::test]
#[serial]
async fn update_status_rejects_illegal_transition() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let mut tx = pool.begin().await.unwrap();
    let result =
        ledger::update_status(&mut tx, id, OrderStatus::Authorized, OrderStatus::PaymentCaptured)
            .await;
    tx.rollback().await.unwrap();

    assert!(matches!(
        result,
        Err(LedgerError::IllegalTransition { from: OrderStatus::Authorized, to: OrderStatus::PaymentCaptured, .. })
    ));

    common::cleanup_aggregate(&pool, id).await;
}

#[tokio::test]
#[serial]
async fn update_status_with_order_id_persists_order_id() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let mut tx = pool.begin().await.unwrap();
    ledger::update_status_with_order_id(
        &mut tx,
        id,
        OrderStatus::Authorized,
        OrderStatus::OrderCreated,
        "ord-123",
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    assert_eq!(aggregate.ledger.status, OrderStatus::OrderCreated);
    assert_eq!(aggregate.ledger.order_id.as_deref(), Some("ord-123"));

    common::cleanup_aggregate(&pool, id).await;
}

#[tokio::test]
#[serial]
async fn find_by_client_request_id_locates_the_row() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let client_request_id: String = sqlx::query_scalar("SELECT client_request_id FROM order_ledger WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();

    let found = ledger::find_by_client_request_id(&pool, &client_request_id)
        .await
        .unwrap()
        .expect("should find the seeded row");

    assert_eq!(found.id, id);

    common::cleanup_aggregate(&pool, id).await;
}
