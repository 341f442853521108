use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use order_saga::clients::RemoteClients;
use order_saga::config::Config;
use order_saga::health::{health, ready};
use order_saga::retry::RetryPolicy;
use order_saga::{db, listener, poller, worker};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("failed to connect to Postgres");

    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("failed to run database migrations");

    tracing::info!("database migrations applied");

    let clients = RemoteClients::from_config(&config);
    let retry_policy = RetryPolicy {
        base_delay_ms: config.retry_base_delay_ms,
        multiplier: config.retry_backoff_multiplier,
        max_attempts: config.max_retry_attempts,
    };

    let (wake_tx, wake_rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    tokio::spawn(listener::run_listener(config.database_url.clone(), wake_tx.clone()));
    tokio::spawn(poller::run_poller(config.poll_interval_ms, wake_tx.clone()));
    drop(wake_tx);

    tokio::spawn(worker::run_worker_loop(
        pool.clone(),
        clients,
        retry_policy,
        config.outbox_batch_size,
        wake_rx,
    ));

    tracing::info!("saga worker tasks started");

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(pool)
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid HOST:PORT");

    tracing::info!("order-saga listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
