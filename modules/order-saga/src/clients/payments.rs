use reqwest::{Client, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use super::{build_http_client, classify_default, decode, send, RemoteError};

#[derive(Debug, Clone)]
pub struct PaymentsClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CapturePaymentResponse {
    #[allow(dead_code)]
    pub capture_id: String,
    #[allow(dead_code)]
    pub authorization_id: String,
    #[allow(dead_code)]
    pub status: String,
}

impl PaymentsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
        }
    }

    /// Step 3 of the saga (spec §4.4): `INVENTORY_RESERVED → PAYMENT_CAPTURED`.
    /// 404/409 (already-voided) are permanent; 5xx including 503 retryable
    /// (spec §6.2).
    pub async fn capture_payment(
        &self,
        authorization_id: &str,
        aggregate_id: Uuid,
    ) -> Result<CapturePaymentResponse, RemoteError> {
        const OP: &str = "payments.capture_payment";

        let req = self
            .http
            .post(format!(
                "{}/payments/capture/{}",
                self.base_url, authorization_id
            ))
            .header("Idempotency-Key", aggregate_id.to_string())
            .json(&serde_json::json!({}));

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK => decode(OP, &body),
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => Err(RemoteError::permanent(
                OP,
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            )),
            StatusCode::SERVICE_UNAVAILABLE => Err(RemoteError::retryable(
                OP,
                503,
                String::from_utf8_lossy(&body).into_owned(),
            )),
            other => Err(classify_default(OP, other, &body)),
        }
    }

    /// Compensation step (spec §4.7). A 404 means nothing was ever captured
    /// and is treated as success; 409 already-captured is permanent and
    /// surfaces as an operator warning upstream (spec §6.2).
    pub async fn void_payment(&self, authorization_id: &str, aggregate_id: Uuid) -> Result<(), RemoteError> {
        const OP: &str = "payments.void_payment";

        let req = self
            .http
            .post(format!(
                "{}/payments/void/{}",
                self.base_url, authorization_id
            ))
            .header("Idempotency-Key", format!("void-{aggregate_id}"))
            .json(&serde_json::json!({}));

        let (status, body) = send(req, OP).await?;

        match status {
            StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
            StatusCode::CONFLICT => Err(RemoteError::permanent(
                OP,
                409,
                String::from_utf8_lossy(&body).into_owned(),
            )),
            other => Err(classify_default(OP, other, &body)),
        }
    }
}
