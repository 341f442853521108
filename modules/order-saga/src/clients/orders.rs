use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LineItem;

use super::{build_http_client, classify_default, decode, send, RemoteError};

#[derive(Debug, Clone)]
pub struct OrdersClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    aggregate_id: Uuid,
    user_id: &'a str,
    total_amount_cents: i64,
    currency: &'a str,
    items: Vec<CreateOrderItem<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateOrderItem<'a> {
    product_id: &'a str,
    quantity: i32,
    unit_price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderResponse {
    pub id: String,
    #[allow(dead_code)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmOrderResponse {
    #[allow(dead_code)]
    id: Option<String>,
    #[serde(default)]
    current_status: Option<String>,
}

impl OrdersClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
        }
    }

    /// Step 1 of the saga (spec §4.4): `AUTHORIZED → ORDER_CREATED`.
    /// Idempotent on the aggregate id (spec §6.2).
    pub async fn create_order(
        &self,
        aggregate_id: Uuid,
        user_id: &str,
        total_amount_cents: i64,
        currency: &str,
        items: &[LineItem],
    ) -> Result<CreateOrderResponse, RemoteError> {
        const OP: &str = "orders.create_order";

        let body = CreateOrderRequest {
            aggregate_id,
            user_id,
            total_amount_cents,
            currency,
            items: items
                .iter()
                .map(|i| CreateOrderItem {
                    product_id: &i.product_id,
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                })
                .collect(),
        };

        let req = self
            .http
            .post(format!("{}/orders", self.base_url))
            .header("Idempotency-Key", aggregate_id.to_string())
            .json(&body);

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK | StatusCode::CREATED => decode(OP, &body),
            other => Err(classify_default(OP, other, &body)),
        }
    }

    /// Step 4 of the saga (spec §4.4): `PAYMENT_CAPTURED → COMPLETED`. A 409
    /// carrying `current_status: CONFIRMED` means a prior attempt already
    /// landed and is treated as success (spec §6.2).
    pub async fn confirm_order(&self, order_id: &str, aggregate_id: Uuid) -> Result<(), RemoteError> {
        const OP: &str = "orders.confirm_order";

        let req = self
            .http
            .post(format!("{}/orders/{}/confirmation", self.base_url, order_id))
            .header("Idempotency-Key", aggregate_id.to_string())
            .json(&serde_json::json!({}));

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => {
                let parsed: ConfirmOrderResponse = decode(OP, &body)?;
                if parsed.current_status.as_deref() == Some("CONFIRMED") {
                    Ok(())
                } else {
                    Err(RemoteError::permanent(
                        OP,
                        409,
                        String::from_utf8_lossy(&body).into_owned(),
                    ))
                }
            }
            other => Err(classify_default(OP, other, &body)),
        }
    }

    /// Compensation-only call undoing step 1 (spec §4.7). Not part of the
    /// §6.2 table; modeled on the release/void "404 is already-undone, treat
    /// as success" convention those endpoints document.
    pub async fn cancel_order(&self, order_id: &str, aggregate_id: Uuid) -> Result<(), RemoteError> {
        const OP: &str = "orders.cancel_order";

        let req = self
            .http
            .delete(format!("{}/orders/{}", self.base_url, order_id))
            .header("Idempotency-Key", format!("cancel-{aggregate_id}"));

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
            other => Err(classify_default(OP, other, &body)),
        }
    }
}
