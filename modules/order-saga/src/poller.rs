//! Polling loop (C4) — spec §4.3.
//!
//! Safety net for missed notifications, dropped listener connections, and
//! matured retries. Never terminates on its own; ticking continues for the
//! life of the process.

use std::time::Duration;

use tokio::sync::mpsc;

pub async fn run_poller(interval_ms: u64, wake: mpsc::UnboundedSender<()>) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        interval.tick().await;
        if wake.send(()).is_err() {
            return;
        }
    }
}
