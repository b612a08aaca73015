//! Synthetic post generation
//!
//! Creates a numbered post on a fixed interval until stopped. Used by the
//! reconnection scenario to keep commits flowing through the deployment
//! while the origin server restarts. The count is the number of attempted
//! posts; together with the collector's buffer length it forms the
//! missed-message heuristic, not a causal guarantee.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::agent::PdsClient;

/// Background post generator bound to one session client.
pub struct SyntheticPoster {
    count: Arc<AtomicU64>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticPoster {
    /// Start posting every `interval`. The client must already hold a
    /// session.
    pub fn start(client: Arc<PdsClient>, interval: Duration) -> Self {
        let count = Arc::new(AtomicU64::new(0));
        let (stop, mut stop_rx) = watch::channel(false);

        info!(interval_ms = interval.as_millis() as u64, "starting synthetic post generation");

        let task_count = count.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // consume the immediate first tick
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => return,
                }
                if *stop_rx.borrow() {
                    return;
                }

                let n = task_count.fetch_add(1, Ordering::Relaxed) + 1;
                let text = format!(
                    "Synthetic post #{n} - {}",
                    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
                );
                match client.create_post(&text).await {
                    Ok(_) => info!(%text, "created synthetic post"),
                    Err(e) => warn!(error = %e, "failed to create synthetic post"),
                }
            }
        });

        Self {
            count,
            stop,
            task: Mutex::new(Some(task)),
        }
    }

    /// Posts attempted so far.
    pub fn post_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Stop generating. Idempotent; returns the final count.
    pub async fn stop(&self) -> u64 {
        self.stop.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        let total = self.post_count();
        info!(total, "stopped synthetic post generation");
        total
    }
}
