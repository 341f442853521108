//! Ledger store (C1) — spec §4.1.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::models::{LineItem, OrderAggregate, OrderLedger, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("order ledger {0} not found")]
    NotFound(Uuid),
    #[error("illegal transition from {from:?} to {to:?} for ledger {id}")]
    IllegalTransition {
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

fn row_to_ledger(row: &sqlx::postgres::PgRow) -> Result<OrderLedger, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = OrderStatus::from_db_str(&status_str).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown order_ledger.status value: {status_str}").into())
    })?;

    Ok(OrderLedger {
        id: row.try_get("id")?,
        client_request_id: row.try_get("client_request_id")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        status,
        total_amount_cents: row.try_get("total_amount_cents")?,
        currency: row.try_get("currency")?,
        payment_authorization_id: row.try_get("payment_authorization_id")?,
        order_id: row.try_get("order_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Single consistent snapshot of a ledger row plus its items, read inside
/// the claimant's transaction so the saga executor never observes a
/// concurrently-committed partial update.
pub async fn find_by_id_with_items(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<OrderAggregate>, sqlx::Error> {
    let ledger_row = sqlx::query("SELECT * FROM order_ledger WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    let Some(ledger_row) = ledger_row else {
        return Ok(None);
    };
    let ledger = row_to_ledger(&ledger_row)?;

    let item_rows = sqlx::query(
        "SELECT id, order_ledger_id, product_id, quantity, unit_price_cents
         FROM order_ledger_items WHERE order_ledger_id = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?;

    let items = item_rows
        .iter()
        .map(|r| {
            Ok(LineItem {
                id: r.try_get("id")?,
                order_ledger_id: r.try_get("order_ledger_id")?,
                product_id: r.try_get("product_id")?,
                quantity: r.try_get("quantity")?,
                unit_price_cents: r.try_get("unit_price_cents")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(Some(OrderAggregate { ledger, items }))
}

/// Drives idempotent order acceptance at the edge (spec §4.1); not called
/// by the saga executor itself, but part of C1's exposed surface.
pub async fn find_by_client_request_id(
    pool: &PgPool,
    client_request_id: &str,
) -> Result<Option<OrderLedger>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM order_ledger WHERE client_request_id = $1")
        .bind(client_request_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_ledger).transpose()
}

/// Validates the transition against spec §3's state machine (invariant I1)
/// before writing; an illegal transition aborts the whole processing
/// transaction.
pub async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    current: OrderStatus,
    new_status: OrderStatus,
) -> Result<(), LedgerError> {
    if !current.can_transition_to(new_status) {
        return Err(LedgerError::IllegalTransition {
            id,
            from: current,
            to: new_status,
        });
    }

    let result = sqlx::query(
        "UPDATE order_ledger SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(new_status.as_db_str())
    .bind(Utc::now())
    .bind(id)
    .bind(current.as_db_str())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound(id));
    }

    tracing::info!(
        aggregate_id = %id,
        from = current.as_db_str(),
        to = new_status.as_db_str(),
        "order_ledger status transition"
    );

    Ok(())
}

/// As `update_status`, also persisting the downstream `orderId` (invariant
/// I4) returned by step 1 of the saga.
pub async fn update_status_with_order_id(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    current: OrderStatus,
    new_status: OrderStatus,
    order_id: &str,
) -> Result<(), LedgerError> {
    if !current.can_transition_to(new_status) {
        return Err(LedgerError::IllegalTransition {
            id,
            from: current,
            to: new_status,
        });
    }

    let result = sqlx::query(
        "UPDATE order_ledger SET status = $1, order_id = $2, updated_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(new_status.as_db_str())
    .bind(order_id)
    .bind(Utc::now())
    .bind(id)
    .bind(current.as_db_str())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound(id));
    }

    tracing::info!(
        aggregate_id = %id,
        from = current.as_db_str(),
        to = new_status.as_db_str(),
        order_id = %order_id,
        "order_ledger status transition"
    );

    Ok(())
}
