use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate status state machine (spec §3). Ordering of variants follows
/// the happy-path transition order; `sqlx` reads/writes the matching
/// upper-snake-case string via `FromRow`/`bind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    AwaitingAuthorization,
    Authorized,
    OrderCreated,
    InventoryReserved,
    PaymentCaptured,
    Compensating,
    Completed,
    Failed,
    AuthorizationFailed,
}

impl OrderStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingAuthorization => "AWAITING_AUTHORIZATION",
            OrderStatus::Authorized => "AUTHORIZED",
            OrderStatus::OrderCreated => "ORDER_CREATED",
            OrderStatus::InventoryReserved => "INVENTORY_RESERVED",
            OrderStatus::PaymentCaptured => "PAYMENT_CAPTURED",
            OrderStatus::Compensating => "COMPENSATING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::AuthorizationFailed => "AUTHORIZATION_FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "AWAITING_AUTHORIZATION" => OrderStatus::AwaitingAuthorization,
            "AUTHORIZED" => OrderStatus::Authorized,
            "ORDER_CREATED" => OrderStatus::OrderCreated,
            "INVENTORY_RESERVED" => OrderStatus::InventoryReserved,
            "PAYMENT_CAPTURED" => OrderStatus::PaymentCaptured,
            "COMPENSATING" => OrderStatus::Compensating,
            "COMPLETED" => OrderStatus::Completed,
            "FAILED" => OrderStatus::Failed,
            "AUTHORIZATION_FAILED" => OrderStatus::AuthorizationFailed,
            _ => return None,
        })
    }

    /// True if `self -> next` is a legal edge of the spec §3 state machine.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (AwaitingAuthorization, Authorized)
                | (AwaitingAuthorization, AuthorizationFailed)
                | (Authorized, OrderCreated)
                | (Authorized, Compensating)
                | (OrderCreated, InventoryReserved)
                | (OrderCreated, Compensating)
                | (InventoryReserved, PaymentCaptured)
                | (InventoryReserved, Compensating)
                | (PaymentCaptured, Completed)
                | (PaymentCaptured, Compensating)
                | (Compensating, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::AuthorizationFailed
        )
    }
}

/// One order aggregate, without its line items (spec §3).
#[derive(Debug, Clone)]
pub struct OrderLedger {
    pub id: Uuid,
    pub client_request_id: String,
    pub user_id: String,
    pub email: String,
    pub status: OrderStatus,
    pub total_amount_cents: i64,
    pub currency: String,
    pub payment_authorization_id: Option<String>,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LineItem {
    pub id: Uuid,
    pub order_ledger_id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

/// A ledger row together with its items — the single consistent snapshot
/// `findByIdWithItems` returns (spec §4.1).
#[derive(Debug, Clone)]
pub struct OrderAggregate {
    pub ledger: OrderLedger,
    pub items: Vec<LineItem>,
}

/// Outbox row status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Processed => "PROCESSED",
            OutboxStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "PENDING" => OutboxStatus::Pending,
            "PROCESSED" => OutboxStatus::Processed,
            "FAILED" => OutboxStatus::Failed,
            _ => return None,
        })
    }
}

/// An outbox row leased by a claimant (spec §3, §4.2).
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: OrderAuthorizedPayload,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Snapshot of what downstream saga steps need, captured at `OrderAuthorized`
/// time so the saga never has to re-derive it from a ledger row that may
/// have already moved on (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAuthorizedPayload {
    pub aggregate_id: Uuid,
    pub user_id: String,
    pub email: String,
    pub total_amount_cents: i64,
    pub currency: String,
    pub payment_authorization_id: String,
}
