//! Outbox & event claimant (C2, C5) — spec §4.2.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::{OrderAuthorizedPayload, OutboxEvent, OutboxStatus};

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<OutboxEvent, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = OutboxStatus::from_db_str(&status_str).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown outbox.status value: {status_str}").into())
    })?;

    let payload_json: serde_json::Value = row.try_get("payload")?;
    let payload: OrderAuthorizedPayload =
        serde_json::from_value(payload_json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(OutboxEvent {
        id: row.try_get("id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        payload,
        status,
        retry_count: row.try_get("retry_count")?,
        next_retry_at: row.try_get("next_retry_at")?,
        created_at: row.try_get("created_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

/// Inserted by the producing service in the same transaction as the
/// `order_ledger` row (spec §3); kept here because the orchestrator owns
/// the table's schema and it is the natural place to ground the round-trip
/// encode/decode test (spec §8).
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    aggregate_id: Uuid,
    payload: &OrderAuthorizedPayload,
) -> Result<(), sqlx::Error> {
    let payload_json =
        serde_json::to_value(payload).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO outbox (id, aggregate_type, aggregate_id, event_type, payload)
         VALUES ($1, 'OrderLedger', $2, 'OrderAuthorized', $3)",
    )
    .bind(id)
    .bind(aggregate_id)
    .bind(payload_json)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Leases up to `batch` due `PENDING` rows, skipping rows already leased by
/// a concurrent claimant, ordered oldest-first (spec §4.2). Must be called
/// inside the transaction the caller will use to process and finalize each
/// event — the lease lives exactly as long as that transaction.
pub async fn claim_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: i64,
) -> Result<Vec<OutboxEvent>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT * FROM outbox
         WHERE status = 'PENDING' AND (next_retry_at IS NULL OR next_retry_at <= now())
         ORDER BY created_at ASC
         LIMIT $1
         FOR UPDATE SKIP LOCKED",
    )
    .bind(batch)
    .fetch_all(&mut **tx)
    .await?;

    rows.iter().map(row_to_event).collect()
}

pub async fn mark_processed(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET status = 'PROCESSED', processed_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_failed(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET status = 'FAILED', processed_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Bumps `retry_count` and schedules `next_retry_at`; the row stays
/// `PENDING` so the next due cycle picks it up (spec §4.2).
pub async fn schedule_retry(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    retry_count: i32,
    next_retry_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET retry_count = $1, next_retry_at = $2 WHERE id = $3")
        .bind(retry_count)
        .bind(next_retry_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// True if `a.status` not in the terminal/pre-authorization set has a
/// matching `PENDING` outbox row (invariant P2 / I2).
pub async fn has_pending_event_for_aggregate(
    pool: &PgPool,
    aggregate_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(
            SELECT 1 FROM outbox WHERE aggregate_id = $1 AND status = 'PENDING'
         )",
    )
    .bind(aggregate_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
