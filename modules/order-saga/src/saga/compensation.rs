//! Compensation executor (C8) — spec §4.7.

use uuid::Uuid;

use crate::clients::RemoteClients;
use crate::models::OrderStatus;

/// Result of running compensation for one aggregate. `failed_steps` names
/// each step whose remote call did not succeed; an empty list means every
/// required step completed (spec invariant P6).
#[derive(Debug, Default)]
pub struct CompensationOutcome {
    pub failed_steps: Vec<&'static str>,
}

impl CompensationOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

/// Runs, independently and best-effort, only the undo steps required by
/// `last_successful_status` (spec §4.7's table), in void-payment /
/// release-inventory / cancel-order order. A step's failure is recorded and
/// does not stop the remaining steps.
pub async fn run_compensation(
    aggregate_id: Uuid,
    order_id: Option<&str>,
    payment_authorization_id: Option<&str>,
    last_successful_status: OrderStatus,
    clients: &RemoteClients,
) -> CompensationOutcome {
    let mut outcome = CompensationOutcome::default();

    let (void_payment, release_inventory, cancel_order) = match last_successful_status {
        OrderStatus::Authorized => (true, false, false),
        OrderStatus::OrderCreated => (true, false, true),
        OrderStatus::InventoryReserved => (true, true, true),
        OrderStatus::PaymentCaptured => (false, true, true),
        other => {
            tracing::warn!(
                aggregate_id = %aggregate_id,
                last_successful_status = ?other,
                "compensation invoked for a status with no defined undo steps"
            );
            (false, false, false)
        }
    };

    if last_successful_status == OrderStatus::PaymentCaptured {
        tracing::warn!(
            aggregate_id = %aggregate_id,
            payment_authorization_id = ?payment_authorization_id,
            "payment already captured before compensation; requires manual refund"
        );
    }

    if void_payment {
        if let Some(authorization_id) = payment_authorization_id {
            if let Err(e) = clients.payments.void_payment(authorization_id, aggregate_id).await {
                tracing::warn!(aggregate_id = %aggregate_id, error = %e, "void_payment failed during compensation");
                outcome.failed_steps.push("void_payment");
            }
        }
    }

    if release_inventory {
        if let Some(order_id) = order_id {
            if let Err(e) = clients.inventory.release_stock(order_id, aggregate_id).await {
                tracing::warn!(aggregate_id = %aggregate_id, error = %e, "release_stock failed during compensation");
                outcome.failed_steps.push("release_stock");
            }
        }
    }

    if cancel_order {
        if let Some(order_id) = order_id {
            if let Err(e) = clients.orders.cancel_order(order_id, aggregate_id).await {
                tracing::warn!(aggregate_id = %aggregate_id, error = %e, "cancel_order failed during compensation");
                outcome.failed_steps.push("cancel_order");
            }
        }
    }

    tracing::info!(
        aggregate_id = %aggregate_id,
        last_successful_status = ?last_successful_status,
        failed_steps = ?outcome.failed_steps,
        "compensation complete"
    );

    outcome
}
