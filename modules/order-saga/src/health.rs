use axum::{extract::State, Json};
use sqlx::PgPool;

/// Liveness check — the process is up and serving.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "order-saga-rs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check — the pool can actually reach the database.
pub async fn ready(State(pool): State<PgPool>) -> Json<serde_json::Value> {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => Json(serde_json::json!({ "status": "ready" })),
        Err(e) => Json(serde_json::json!({ "status": "not_ready", "error": e.to_string() })),
    }
}
