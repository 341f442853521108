mod common;

use order_saga::clients::{InventoryClient, OrdersClient, PaymentsClient, RemoteClients};
use order_saga::ledger;
use order_saga::models::OrderStatus;
use order_saga::saga::{execute_saga, SagaOutcome};
use serial_test::serial;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn stub_clients_happy_path() -> (MockServer, MockServer, MockServer, RemoteClients) {
    let orders_server = MockServer::start().await;
    let inventory_server = MockServer::start().await;
    let payments_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "ord-1",
            "status": "CREATED"
        })))
        .up_to_n_times(1)
        .mount(&orders_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ord-1",
            "status": "CONFIRMED"
        })))
        .mount(&orders_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "reservation_ids": ["r1"],
            "line_items_reserved": 1,
            "total_quantity_reserved": 2
        })))
        .mount(&inventory_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "capture_id": "cap-1",
            "authorization_id": "auth-1",
            "status": "CAPTURED"
        })))
        .mount(&payments_server)
        .await;

    let clients = RemoteClients {
        orders: OrdersClient::new(orders_server.uri()),
        inventory: InventoryClient::new(inventory_server.uri()),
        payments: PaymentsClient::new(payments_server.uri()),
    };

    (orders_server, inventory_server, payments_server, clients)
}

/// Scenario 1 (spec §8): happy path drives AUTHORIZED all the way to
/// COMPLETED in a single invocation, with orderId persisted.
#[tokio::test]
#[serial]
async fn happy_path_reaches_completed_in_one_invocation() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;
    let (_orders, _inventory, _payments, clients) = stub_clients_happy_path().await;

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    let outcome = execute_saga(&mut tx, aggregate, &clients).await.unwrap();
    tx.commit().await.unwrap();

    assert!(matches!(outcome, SagaOutcome::Completed));

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    assert_eq!(aggregate.ledger.status, OrderStatus::Completed);
    assert_eq!(aggregate.ledger.order_id.as_deref(), Some("ord-1"));

    common::cleanup_aggregate(&pool, id).await;
}

/// Scenario 3 (spec §8): insufficient stock is business-permanent and must
/// be reclassified as `RequiresCompensation` at the `ORDER_CREATED` step,
/// naming `ORDER_CREATED` as the last successful status.
#[tokio::test]
#[serial]
async fn insufficient_stock_requires_compensation_from_order_created() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let orders_server = MockServer::start().await;
    let inventory_server = MockServer::start().await;
    let payments_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "ord-2",
            "status": "CREATED"
        })))
        .mount(&orders_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "insufficient_stock",
            "product_id": "sku-1",
            "requested": 10,
            "available": 5
        })))
        .mount(&inventory_server)
        .await;

    let clients = RemoteClients {
        orders: OrdersClient::new(orders_server.uri()),
        inventory: InventoryClient::new(inventory_server.uri()),
        payments: PaymentsClient::new(payments_server.uri()),
    };

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    let outcome = execute_saga(&mut tx, aggregate, &clients).await.unwrap();
    tx.commit().await.unwrap();

    match outcome {
        SagaOutcome::RequiresCompensation { last_successful_status } => {
            assert_eq!(last_successful_status, OrderStatus::OrderCreated);
        }
        other => panic!("expected RequiresCompensation, got {other:?}"),
    }

    // create_order already committed ORDER_CREATED before the reservation failed.
    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(aggregate.ledger.status, OrderStatus::OrderCreated);

    common::cleanup_aggregate(&pool, id).await;
}

/// Scenario 2 (spec §8): a transient 503 from inventory must be retryable
/// and must not advance the ledger past `ORDER_CREATED`.
#[tokio::test]
#[serial]
async fn transient_inventory_outage_requires_retry_without_advancing_status() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;

    let orders_server = MockServer::start().await;
    let inventory_server = MockServer::start().await;
    let payments_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "ord-3",
            "status": "CREATED"
        })))
        .mount(&orders_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&inventory_server)
        .await;

    let clients = RemoteClients {
        orders: OrdersClient::new(orders_server.uri()),
        inventory: InventoryClient::new(inventory_server.uri()),
        payments: PaymentsClient::new(payments_server.uri()),
    };

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    let outcome = execute_saga(&mut tx, aggregate, &clients).await.unwrap();
    tx.commit().await.unwrap();

    match outcome {
        SagaOutcome::RequiresRetry { current_status } => {
            assert_eq!(current_status, OrderStatus::OrderCreated);
        }
        other => panic!("expected RequiresRetry, got {other:?}"),
    }

    let mut tx = pool.begin().await.unwrap();
    let aggregate = ledger::find_by_id_with_items(&mut tx, id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(aggregate.ledger.status, OrderStatus::OrderCreated);

    common::cleanup_aggregate(&pool, id).await;
}
