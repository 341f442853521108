use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LineItem;

use super::{build_http_client, classify_default, decode, send, RemoteError};

#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ReserveStockRequest<'a> {
    order_id: &'a str,
    items: Vec<ReserveStockItem<'a>>,
}

#[derive(Debug, Serialize)]
struct ReserveStockItem<'a> {
    product_id: &'a str,
    quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReserveStockResponse {
    #[allow(dead_code)]
    pub reservation_ids: Vec<String>,
    #[allow(dead_code)]
    pub line_items_reserved: i64,
    #[allow(dead_code)]
    pub total_quantity_reserved: i64,
}

#[derive(Debug, Deserialize)]
struct InsufficientStockBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    requested: Option<i64>,
    #[serde(default)]
    available: Option<i64>,
}

impl InventoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
        }
    }

    /// Step 2 of the saga (spec §4.4): `ORDER_CREATED → INVENTORY_RESERVED`.
    /// A 409 `insufficient_stock` or a 404 unknown product are both
    /// business-permanent and require compensation (spec §6.2).
    pub async fn reserve_stock(
        &self,
        order_id: &str,
        aggregate_id: Uuid,
        items: &[LineItem],
    ) -> Result<ReserveStockResponse, RemoteError> {
        const OP: &str = "inventory.reserve_stock";

        let body = ReserveStockRequest {
            order_id,
            items: items
                .iter()
                .map(|i| ReserveStockItem {
                    product_id: &i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        };

        let req = self
            .http
            .post(format!("{}/reservations", self.base_url))
            .header("Idempotency-Key", aggregate_id.to_string())
            .json(&body);

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::CREATED => decode(OP, &body),
            StatusCode::CONFLICT => {
                let parsed: InsufficientStockBody = decode(OP, &body).unwrap_or(InsufficientStockBody {
                    error: None,
                    product_id: None,
                    requested: None,
                    available: None,
                });
                let reason = format!(
                    "{}: product={:?} requested={:?} available={:?}",
                    parsed.error.as_deref().unwrap_or("insufficient_stock"),
                    parsed.product_id,
                    parsed.requested,
                    parsed.available
                );
                Err(RemoteError::permanent(OP, 409, reason))
            }
            StatusCode::NOT_FOUND => Err(RemoteError::permanent(
                OP,
                404,
                String::from_utf8_lossy(&body).into_owned(),
            )),
            other => Err(classify_default(OP, other, &body)),
        }
    }

    /// Compensation step (spec §4.7). A 404 means the reservation is already
    /// gone and is treated as success (spec §6.2).
    pub async fn release_stock(&self, order_id: &str, aggregate_id: Uuid) -> Result<(), RemoteError> {
        const OP: &str = "inventory.release_stock";

        let req = self
            .http
            .delete(format!("{}/reservations/{}", self.base_url, order_id))
            .header("Idempotency-Key", format!("release-{aggregate_id}"));

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
            other => Err(classify_default(OP, other, &body)),
        }
    }
}
