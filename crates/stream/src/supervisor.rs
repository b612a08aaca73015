//! Reconnect supervision with bounded exponential backoff
//!
//! The supervisor watches one connection's lifecycle. On an unsolicited
//! close it schedules a retry after `min(base × multiplier^(n−1), cap)`,
//! invokes the observer callback just before the retry fires, and gives up
//! permanently once the attempt count reaches the configured maximum.
//! Attempt numbering restarts after every successful open; the cumulative
//! reconnect count never resets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::buffer::EventBuffer;
use crate::collector::CollectorConfig;
use crate::connection::{Disconnect, StreamConnection};

/// Immutable backoff configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            multiplier: 2.0,
            cap: Duration::from_millis(30_000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before attempt `n` (1-based). Deterministic given the
    /// attempt number, independent of prior real-world timing.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let scaled = self.base.as_millis() as f64 * self.multiplier.powi(exponent as i32);
        let capped = scaled.min(self.cap.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not running (never started, or explicitly stopped).
    Idle,
    Connected,
    ReconnectScheduled,
    /// Terminal: retries are spent and the stream is permanently lost.
    Exhausted,
}

/// Called with the 1-based attempt number just before each retry fires.
pub type ReconnectObserver = Arc<dyn Fn(u32) + Send + Sync>;

/// State shared between a collector handle and its supervise task.
pub(crate) struct Shared {
    pub(crate) state: Mutex<SupervisorState>,
    pub(crate) reconnects: AtomicU64,
    pub(crate) observer: Mutex<Option<ReconnectObserver>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SupervisorState::Idle),
            reconnects: AtomicU64::new(0),
            observer: Mutex::new(None),
        }
    }
}

/// Drive one connection until stopped or exhausted.
pub(crate) async fn supervise(
    shared: Arc<Shared>,
    buffer: EventBuffer,
    config: CollectorConfig,
    mut stop: watch::Receiver<bool>,
    mut conn: StreamConnection,
) {
    let url = config.subscribe_url();
    'connected: loop {
        match conn.deliver(&buffer, &mut stop).await {
            Disconnect::Stopped => break 'connected,
            Disconnect::Remote => info!("stream connection closed by peer"),
            Disconnect::Transport(e) => warn!(error = %e, "stream connection lost"),
        }

        // Unsolicited close: retry with backoff until reconnected,
        // stopped, or out of attempts.
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if attempt > config.policy.max_attempts {
                *shared.state.lock() = SupervisorState::Exhausted;
                error!(
                    attempts = config.policy.max_attempts,
                    "reconnect attempts exhausted, stream is permanently lost"
                );
                return;
            }

            *shared.state.lock() = SupervisorState::ReconnectScheduled;
            let delay = config.policy.delay(attempt);
            info!(
                attempt,
                max_attempts = config.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnect"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break 'connected;
                    }
                }
            }
            // still-wanted check: a cleared flag makes the scheduled
            // reconnect a no-op
            if *stop.borrow() {
                break 'connected;
            }

            let observer = shared.observer.lock().clone();
            if let Some(observer) = observer {
                observer(attempt);
            }
            shared.reconnects.fetch_add(1, Ordering::Relaxed);

            match StreamConnection::connect(&url, config.connect_timeout).await {
                Ok(fresh) => {
                    conn = fresh;
                    *shared.state.lock() = SupervisorState::Connected;
                    info!(attempt, "reconnected");
                    continue 'connected;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "reconnect attempt failed");
                }
            }
        }
    }
    *shared.state.lock() = SupervisorState::Idle;
}
