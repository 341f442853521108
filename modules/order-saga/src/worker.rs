//! Claim-and-process cycle shared by the listener (C3) and the poller (C4).
//!
//! Both wake-up sources funnel into [`run_claim_and_process_cycle`], which
//! leases a batch, drives each leased event through the saga executor, and
//! commits once. A `sqlx::Error` anywhere in the cycle propagates out before
//! commit, so the whole batch rolls back and its rows fall back to
//! unclaimed `PENDING` for the next cycle — the spec §7 "infrastructure"
//! error category.

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::clients::RemoteClients;
use crate::ledger;
use crate::models::{OutboxEvent, OutboxStatus};
use crate::outbox;
use crate::retry::RetryPolicy;
use crate::saga::{self, SagaOutcome};

/// Drains wake-up tokens from both the listener and the poller, running one
/// claim-and-process cycle per token (spec §4.3/§5 — only one cycle is ever
/// in flight per worker process, which this sequential drain guarantees
/// without a separate mutex). Exits when both producers have dropped their
/// sender halves, which happens only on process shutdown.
pub async fn run_worker_loop(
    pool: PgPool,
    clients: RemoteClients,
    retry_policy: RetryPolicy,
    batch_size: i64,
    mut wake: mpsc::UnboundedReceiver<()>,
) {
    while wake.recv().await.is_some() {
        match run_claim_and_process_cycle(&pool, &clients, &retry_policy, batch_size).await {
            Ok(leased) if leased > 0 => {
                tracing::debug!(leased, "claim-and-process cycle leased events");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "claim-and-process cycle aborted, batch rolled back");
            }
        }
    }
}

/// Runs one claim-and-process cycle. Returns the number of events leased
/// (zero is the common case — most wake-ups find nothing due).
pub async fn run_claim_and_process_cycle(
    pool: &PgPool,
    clients: &RemoteClients,
    retry_policy: &RetryPolicy,
    batch_size: i64,
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let events = outbox::claim_batch(&mut tx, batch_size).await?;
    let leased = events.len();

    for event in events {
        process_one_event(&mut tx, event, clients, retry_policy).await?;
    }

    tx.commit().await?;

    Ok(leased)
}

async fn process_one_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event: OutboxEvent,
    clients: &RemoteClients,
    retry_policy: &RetryPolicy,
) -> Result<(), sqlx::Error> {
    let span = tracing::info_span!(
        "saga_invocation",
        aggregate_id = %event.aggregate_id,
        event_id = %event.id,
    );
    let _guard = span.enter();

    debug_assert_eq!(event.status, OutboxStatus::Pending);

    let aggregate = ledger::find_by_id_with_items(tx, event.aggregate_id).await?;

    let Some(aggregate) = aggregate else {
        tracing::error!(aggregate_id = %event.aggregate_id, "ledger row missing for leased outbox event");
        return outbox::mark_failed(tx, event.id).await;
    };

    let order_id = aggregate.ledger.order_id.clone();
    let payment_authorization_id = aggregate.ledger.payment_authorization_id.clone();

    let outcome = saga::execute_saga(tx, aggregate, clients).await?;

    match outcome {
        SagaOutcome::Completed => {
            tracing::info!(aggregate_id = %event.aggregate_id, "saga completed");
            outbox::mark_processed(tx, event.id).await
        }

        SagaOutcome::RequiresRetry { current_status } => {
            let new_retry_count = event.retry_count + 1;

            if retry_policy.is_max_retries_exceeded(new_retry_count) {
                tracing::warn!(
                    aggregate_id = %event.aggregate_id,
                    retry_count = new_retry_count,
                    "retry attempts exhausted, escalating to compensation"
                );
                enter_compensation(
                    tx,
                    event.id,
                    event.aggregate_id,
                    current_status,
                    order_id,
                    payment_authorization_id,
                    clients,
                )
                .await
            } else {
                let next_retry_at = retry_policy.next_retry_at(new_retry_count, Utc::now());
                tracing::info!(
                    aggregate_id = %event.aggregate_id,
                    retry_count = new_retry_count,
                    next_retry_at = %next_retry_at,
                    "saga step requires retry"
                );
                outbox::schedule_retry(tx, event.id, new_retry_count, next_retry_at).await
            }
        }

        SagaOutcome::RequiresCompensation {
            last_successful_status,
        } => {
            enter_compensation(
                tx,
                event.id,
                event.aggregate_id,
                last_successful_status,
                order_id,
                payment_authorization_id,
                clients,
            )
            .await
        }

        SagaOutcome::Failed { reason } => {
            tracing::error!(aggregate_id = %event.aggregate_id, reason = %reason, "saga failed without compensation");
            outbox::mark_failed(tx, event.id).await
        }
    }
}

async fn enter_compensation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    outbox_id: Uuid,
    aggregate_id: Uuid,
    last_successful_status: crate::models::OrderStatus,
    order_id: Option<String>,
    payment_authorization_id: Option<String>,
    clients: &RemoteClients,
) -> Result<(), sqlx::Error> {
    ledger::update_status(
        tx,
        aggregate_id,
        last_successful_status,
        crate::models::OrderStatus::Compensating,
    )
    .await
    .map_err(|e| match e {
        ledger::LedgerError::Db(db) => db,
        other => sqlx::Error::Protocol(other.to_string()),
    })?;

    let compensation_outcome = saga::run_compensation(
        aggregate_id,
        order_id.as_deref(),
        payment_authorization_id.as_deref(),
        last_successful_status,
        clients,
    )
    .await;

    if !compensation_outcome.is_success() {
        tracing::warn!(
            aggregate_id = %aggregate_id,
            failed_steps = ?compensation_outcome.failed_steps,
            "compensation finished with failing steps; operator follow-up required"
        );
    }

    ledger::update_status(
        tx,
        aggregate_id,
        crate::models::OrderStatus::Compensating,
        crate::models::OrderStatus::Failed,
    )
    .await
    .map_err(|e| match e {
        ledger::LedgerError::Db(db) => db,
        other => sqlx::Error::Protocol(other.to_string()),
    })?;

    outbox::mark_failed(tx, outbox_id).await
}
