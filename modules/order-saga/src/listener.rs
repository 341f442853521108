//! Change-notification listener (C3) — spec §4.3.
//!
//! Subscribes to `order_events` on a dedicated connection outside the pool
//! (long-lived `LISTEN` sessions must not consume pooled connections) and
//! forwards a non-semantic wake-up token per notification. Notifications
//! are hints only; a missed or duplicate one cannot lose or duplicate work
//! since the poller and the skip-locked lease both guard correctness.

use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CHANNEL: &str = "order_events";

pub async fn run_listener(database_url: String, wake: mpsc::UnboundedSender<()>) {
    loop {
        match PgListener::connect(&database_url).await {
            Ok(mut listener) => {
                if let Err(e) = listener.listen(CHANNEL).await {
                    tracing::warn!(error = %e, "failed to subscribe to order_events, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }

                tracing::info!(channel = CHANNEL, "listening for order event notifications");

                loop {
                    match listener.recv().await {
                        Ok(_notification) => {
                            if wake.send(()).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "listener disconnected, releasing connection; poller will carry traffic until reconnect");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to establish listener connection, retrying");
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
