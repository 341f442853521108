use std::env;

/// Application configuration parsed from environment variables (spec §6.3).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub max_retry_attempts: i32,
    pub retry_base_delay_ms: i64,
    pub retry_backoff_multiplier: i64,
    pub outbox_batch_size: i64,
    pub orders_service_url: String,
    pub inventory_service_url: String,
    pub payments_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8099".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let poll_interval_ms: u64 = env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| "POLL_INTERVAL_MS must be a valid u64".to_string())?;

        let max_retry_attempts: i32 = env::var("MAX_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| "MAX_RETRY_ATTEMPTS must be a valid i32".to_string())?;

        let retry_base_delay_ms: i64 = env::var("RETRY_BASE_DELAY_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|_| "RETRY_BASE_DELAY_MS must be a valid i64".to_string())?;

        let retry_backoff_multiplier: i64 = env::var("RETRY_BACKOFF_MULTIPLIER")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .map_err(|_| "RETRY_BACKOFF_MULTIPLIER must be a valid i64".to_string())?;

        let outbox_batch_size: i64 = env::var("OUTBOX_BATCH_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| "OUTBOX_BATCH_SIZE must be a valid i64".to_string())?;

        let orders_service_url = env::var("ORDERS_SERVICE_URL")
            .map_err(|_| "ORDERS_SERVICE_URL must be set".to_string())?;
        let inventory_service_url = env::var("INVENTORY_SERVICE_URL")
            .map_err(|_| "INVENTORY_SERVICE_URL must be set".to_string())?;
        let payments_service_url = env::var("PAYMENTS_SERVICE_URL")
            .map_err(|_| "PAYMENTS_SERVICE_URL must be set".to_string())?;

        Ok(Config {
            database_url,
            host,
            port,
            poll_interval_ms,
            max_retry_attempts,
            retry_base_delay_ms,
            retry_backoff_multiplier,
            outbox_batch_size,
            orders_service_url,
            inventory_service_url,
            payments_service_url,
        })
    }
}
