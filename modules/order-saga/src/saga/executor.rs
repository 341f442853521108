//! Saga executor (C6) — spec §4.4.

use sqlx::{Postgres, Transaction};

use crate::clients::RemoteClients;
use crate::ledger::{self, LedgerError};
use crate::models::{OrderAggregate, OrderStatus};

/// Outcome of one `execute_saga` invocation. `RequiresRetry` and
/// `RequiresCompensation` both carry the aggregate's actual status at the
/// point of the failing step — exactly the `lastSuccessfulStatus` the
/// compensation table in spec §4.7 dispatches on — rather than letting the
/// caller infer it from whatever status the aggregate had when the
/// invocation started, since a fall-through invocation can commit one or
/// more status transitions before the step that ultimately fails.
#[derive(Debug)]
pub enum SagaOutcome {
    Completed,
    RequiresRetry { current_status: OrderStatus },
    RequiresCompensation { last_successful_status: OrderStatus },
    Failed { reason: String },
}

/// Maps a ledger write failure to the right `execute_saga` outcome. A
/// `Db` error is spec §7's infrastructure class: it propagates to the
/// caller so the whole batch transaction aborts and rolls back, rather
/// than being recorded as a terminal, compensation-skipping `Failed`.
/// `NotFound`/`IllegalTransition` are genuine state-integrity violations
/// (spec §7's state class) and do legitimately terminate the saga.
fn ledger_write_failed(e: LedgerError) -> Result<SagaOutcome, sqlx::Error> {
    match e {
        LedgerError::Db(db_err) => Err(db_err),
        other => Ok(SagaOutcome::Failed {
            reason: other.to_string(),
        }),
    }
}

/// Drives `aggregate` as far forward as it can go in one invocation,
/// dispatching on its current status and falling through to the next step
/// after each successful write (spec §4.4). Pure with respect to the event:
/// replaying from any attainable status converges to the same terminal
/// outcome (invariant P3). A `sqlx::Error` here means the invoking
/// transaction is poisoned; the caller must let it propagate rather than
/// commit anything.
pub async fn execute_saga(
    tx: &mut Transaction<'_, Postgres>,
    mut aggregate: OrderAggregate,
    clients: &RemoteClients,
) -> Result<SagaOutcome, sqlx::Error> {
    let id = aggregate.ledger.id;

    loop {
        match aggregate.ledger.status {
            OrderStatus::AwaitingAuthorization => {
                return Ok(SagaOutcome::Failed {
                    reason: "saga invoked before authorization".to_string(),
                });
            }

            OrderStatus::Authorized => {
                let result = clients
                    .orders
                    .create_order(
                        id,
                        &aggregate.ledger.user_id,
                        aggregate.ledger.total_amount_cents,
                        &aggregate.ledger.currency,
                        &aggregate.items,
                    )
                    .await;

                match result {
                    Ok(response) => {
                        if let Err(e) = ledger::update_status_with_order_id(
                            tx,
                            id,
                            OrderStatus::Authorized,
                            OrderStatus::OrderCreated,
                            &response.id,
                        )
                        .await
                        {
                            return ledger_write_failed(e);
                        }
                        aggregate.ledger.order_id = Some(response.id);
                        aggregate.ledger.status = OrderStatus::OrderCreated;
                    }
                    Err(e) if e.is_retryable => {
                        return Ok(SagaOutcome::RequiresRetry {
                            current_status: aggregate.ledger.status,
                        })
                    }
                    Err(_) => {
                        return Ok(SagaOutcome::RequiresCompensation {
                            last_successful_status: OrderStatus::Authorized,
                        })
                    }
                }
            }

            OrderStatus::OrderCreated => {
                let Some(order_id) = aggregate.ledger.order_id.clone() else {
                    return Ok(SagaOutcome::Failed {
                        reason: "order_id missing at ORDER_CREATED".to_string(),
                    });
                };

                let result = clients
                    .inventory
                    .reserve_stock(&order_id, id, &aggregate.items)
                    .await;

                match result {
                    Ok(_) => {
                        if let Err(e) = ledger::update_status(
                            tx,
                            id,
                            OrderStatus::OrderCreated,
                            OrderStatus::InventoryReserved,
                        )
                        .await
                        {
                            return ledger_write_failed(e);
                        }
                        aggregate.ledger.status = OrderStatus::InventoryReserved;
                    }
                    Err(e) if e.is_retryable => {
                        return Ok(SagaOutcome::RequiresRetry {
                            current_status: aggregate.ledger.status,
                        })
                    }
                    Err(_) => {
                        return Ok(SagaOutcome::RequiresCompensation {
                            last_successful_status: OrderStatus::OrderCreated,
                        })
                    }
                }
            }

            OrderStatus::InventoryReserved => {
                let Some(authorization_id) = aggregate.ledger.payment_authorization_id.clone()
                else {
                    return Ok(SagaOutcome::Failed {
                        reason: "payment_authorization_id missing at INVENTORY_RESERVED"
                            .to_string(),
                    });
                };

                let result = clients.payments.capture_payment(&authorization_id, id).await;

                match result {
                    Ok(_) => {
                        if let Err(e) = ledger::update_status(
                            tx,
                            id,
                            OrderStatus::InventoryReserved,
                            OrderStatus::PaymentCaptured,
                        )
                        .await
                        {
                            return ledger_write_failed(e);
                        }
                        aggregate.ledger.status = OrderStatus::PaymentCaptured;
                    }
                    Err(e) if e.is_retryable => {
                        return Ok(SagaOutcome::RequiresRetry {
                            current_status: aggregate.ledger.status,
                        })
                    }
                    Err(_) => {
                        return Ok(SagaOutcome::RequiresCompensation {
                            last_successful_status: OrderStatus::InventoryReserved,
                        })
                    }
                }
            }

            OrderStatus::PaymentCaptured => {
                let Some(order_id) = aggregate.ledger.order_id.clone() else {
                    return Ok(SagaOutcome::Failed {
                        reason: "order_id missing at PAYMENT_CAPTURED".to_string(),
                    });
                };

                let result = clients.orders.confirm_order(&order_id, id).await;

                match result {
                    Ok(()) => {
                        if let Err(e) = ledger::update_status(
                            tx,
                            id,
                            OrderStatus::PaymentCaptured,
                            OrderStatus::Completed,
                        )
                        .await
                        {
                            return ledger_write_failed(e);
                        }
                        aggregate.ledger.status = OrderStatus::Completed;
                        return Ok(SagaOutcome::Completed);
                    }
                    Err(e) if e.is_retryable => {
                        return Ok(SagaOutcome::RequiresRetry {
                            current_status: aggregate.ledger.status,
                        })
                    }
                    Err(_) => {
                        return Ok(SagaOutcome::RequiresCompensation {
                            last_successful_status: OrderStatus::PaymentCaptured,
                        })
                    }
                }
            }

            OrderStatus::Completed => return Ok(SagaOutcome::Completed),

            OrderStatus::Compensating
            | OrderStatus::Failed
            | OrderStatus::AuthorizationFailed => {
                return Ok(SagaOutcome::Failed {
                    reason: format!(
                        "saga invoked on terminal/compensating status {:?}",
                        aggregate.ledger.status
                    ),
                })
            }
        }
    }
}
