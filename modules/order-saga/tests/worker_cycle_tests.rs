mod common;

use order_saga::clients::{InventoryClient, OrdersClient, PaymentsClient, RemoteClients};
use order_saga::models::{OrderAuthorizedPayload, OrderStatus, OutboxStatus};
use order_saga::outbox;
use order_saga::retry::RetryPolicy;
use order_saga::worker::run_claim_and_process_cycle;
use serial_test::serial;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// End-to-end happy path (spec §8 scenario 1) through the same entry point
/// the listener and poller use: one claim-and-process cycle takes the
/// aggregate from `AUTHORIZED` to `COMPLETED` and marks its outbox row
/// `PROCESSED`.
#[tokio::test]
#[serial]
async fn one_cycle_completes_the_happy_path_and_marks_outbox_processed() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;
    let event_id = Uuid::new_v4();

    let mut tx = pool.begin().await.unwrap();
    outbox::insert(
        &mut tx,
        event_id,
        id,
        &OrderAuthorizedPayload {
            aggregate_id: id,
            user_id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            total_amount_cents: 2000,
            currency: "USD".to_string(),
            payment_authorization_id: "auth-1".to_string(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let orders_server = MockServer::start().await;
    let inventory_server = MockServer::start().await;
    let payments_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "ord-9", "status": "CREATED"})))
        .up_to_n_times(1)
        .mount(&orders_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ord-9", "status": "CONFIRMED"})))
        .mount(&orders_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "reservation_ids": ["r1"], "line_items_reserved": 1, "total_quantity_reserved": 2
        })))
        .mount(&inventory_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "capture_id": "cap-9", "authorization_id": "auth-1", "status": "CAPTURED"
        })))
        .mount(&payments_server)
        .await;

    let clients = RemoteClients {
        orders: OrdersClient::new(orders_server.uri()),
        inventory: InventoryClient::new(inventory_server.uri()),
        payments: PaymentsClient::new(payments_server.uri()),
    };
    let retry_policy = RetryPolicy::default();

    let leased = run_claim_and_process_cycle(&pool, &clients, &retry_policy, 10)
        .await
        .unwrap();
    assert!(leased >= 1);

    let status: String = sqlx::query_scalar("SELECT status FROM order_ledger WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "COMPLETED");

    let outbox_status: String = sqlx::query_scalar("SELECT status FROM outbox WHERE id = $1")
        .bind(event_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(outbox_status, "PROCESSED");

    let has_pending = outbox::has_pending_event_for_aggregate(&pool, id).await.unwrap();
    assert!(!has_pending);

    common::cleanup_aggregate(&pool, id).await;
}

/// Scenario 4 analogue (spec §8): a step whose error is classified
/// permanent drives the aggregate through COMPENSATING to FAILED and marks
/// the outbox row FAILED in the same cycle.
#[tokio::test]
#[serial]
async fn permanent_failure_compensates_and_marks_outbox_failed() {
    let pool = common::get_test_pool().await;
    let id = common::seed_authorized_aggregate(&pool, 2000, 2, 1000).await;
    let event_id = Uuid::new_v4();

    let mut tx = pool.begin().await.unwrap();
    outbox::insert(
        &mut tx,
        event_id,
        id,
        &OrderAuthorizedPayload {
            aggregate_id: id,
            user_id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            total_amount_cents: 2000,
            currency: "USD".to_string(),
            payment_authorization_id: "auth-1".to_string(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let orders_server = MockServer::start().await;
    let inventory_server = MockServer::start().await;
    let payments_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "ord-10", "status": "CREATED"})))
        .mount(&orders_server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&orders_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "error": "insufficient_stock", "product_id": "sku-1", "requested": 10, "available": 5
        })))
        .mount(&inventory_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&payments_server)
        .await;

    let clients = RemoteClients {
        orders: OrdersClient::new(orders_server.uri()),
        inventory: InventoryClient::new(inventory_server.uri()),
        payments: PaymentsClient::new(payments_server.uri()),
    };
    let retry_policy = RetryPolicy::default();

    run_claim_and_process_cycle(&pool, &clients, &retry_policy, 10)
        .await
        .unwrap();

    let status: String = sqlx::query_scalar("SELECT status FROM order_ledger WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Failed.as_db_str());

    let outbox_status: String = sqlx::query_scalar("SELECT status FROM outbox WHERE id = $1")
        .bind(event_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(outbox_status, OutboxStatus::Failed.as_db_str());

    common::cleanup_aggregate(&pool, id).await;
}
