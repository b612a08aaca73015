//! Collector: one endpoint subscription, one buffer, one supervisor
//!
//! A collector is created per test (or per logical peer in multi-peer
//! tests), lives for one test case, and must be stopped in a
//! guaranteed-cleanup phase regardless of outcome. Reconnect counters and
//! lifecycle state are owned by the instance, never process-wide.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::buffer::EventBuffer;
use crate::connection::StreamConnection;
use crate::error::{Result, StreamError};
use crate::supervisor::{self, ReconnectPolicy, Shared, SupervisorState};

/// Configuration for one collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Subscribe endpoint, e.g. `wss://host/subscribe`. Query parameters
    /// are appended from the fields below.
    pub endpoint: String,
    /// Server-side collection filter (`wantedCollections`). Empty means
    /// everything the endpoint emits.
    pub wanted_collections: Vec<String>,
    /// Resume cursor, if the endpoint supports one.
    pub cursor: Option<u64>,
    /// Bounded wait for the open signal.
    pub connect_timeout: Duration,
    pub policy: ReconnectPolicy,
}

impl CollectorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            wanted_collections: Vec::new(),
            cursor: None,
            connect_timeout: Duration::from_secs(30),
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn wanted_collection(mut self, collection: impl Into<String>) -> Self {
        self.wanted_collections.push(collection.into());
        self
    }

    pub fn cursor(mut self, cursor: u64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Full subscribe URL with query parameters.
    pub fn subscribe_url(&self) -> String {
        let mut params: Vec<String> = self
            .wanted_collections
            .iter()
            .map(|c| format!("wantedCollections={c}"))
            .collect();
        if let Some(cursor) = self.cursor {
            params.push(format!("cursor={cursor}"));
        }
        if params.is_empty() {
            return self.endpoint.clone();
        }
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.endpoint, sep, params.join("&"))
    }
}

/// Owns one live subscription: connection, buffer, and reconnect
/// supervision. See the crate docs for the control flow.
pub struct Collector {
    config: CollectorConfig,
    buffer: EventBuffer,
    shared: Arc<Shared>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            config,
            buffer: EventBuffer::new(),
            shared: Arc::new(Shared::new()),
            stop,
            task: Mutex::new(None),
        }
    }

    /// Register a callback invoked with the attempt number just before
    /// each reconnect attempt fires. Call before [`start`].
    ///
    /// [`start`]: Collector::start
    pub fn on_reconnect(&self, observer: impl Fn(u32) + Send + Sync + 'static) {
        *self.shared.observer.lock() = Some(Arc::new(observer));
    }

    /// Connect and begin collecting. Fails if the initial handshake times
    /// out or errors; reconnection only ever applies after a successful
    /// first open.
    pub async fn start(&self) -> Result<()> {
        if self.task.lock().is_some() {
            return Err(StreamError::AlreadyStarted);
        }

        let url = self.config.subscribe_url();
        let conn = StreamConnection::connect(&url, self.config.connect_timeout).await?;
        *self.shared.state.lock() = SupervisorState::Connected;

        let handle = tokio::spawn(supervisor::supervise(
            self.shared.clone(),
            self.buffer.clone(),
            self.config.clone(),
            self.stop.subscribe(),
            conn,
        ));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// The buffer this collector fills.
    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn state(&self) -> SupervisorState {
        *self.shared.state.lock()
    }

    /// Cumulative count of reconnect attempts fired.
    pub fn reconnects(&self) -> u64 {
        self.shared.reconnects.load(Ordering::Relaxed)
    }

    /// Err if the supervisor has given up; used by callers that must fail
    /// fast instead of waiting on a dead stream.
    pub fn ensure_live(&self) -> Result<()> {
        if self.state() == SupervisorState::Exhausted {
            return Err(StreamError::ReconnectExhausted {
                attempts: self.config.policy.max_attempts,
            });
        }
        Ok(())
    }

    /// Tear down the connection and disable reconnection. Idempotent; the
    /// only supported way to end the lifecycle, and required on all exit
    /// paths so sockets do not leak across test runs.
    pub async fn stop(&self) {
        self.stop.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        *self.shared.state.lock() = SupervisorState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_url_appends_query_params() {
        let config = CollectorConfig::new("wss://jetstream.local.example/subscribe")
            .wanted_collection("app.bsky.feed.post")
            .cursor(4_397_000);
        assert_eq!(
            config.subscribe_url(),
            "wss://jetstream.local.example/subscribe?wantedCollections=app.bsky.feed.post&cursor=4397000"
        );
    }

    #[test]
    fn subscribe_url_without_params_is_untouched() {
        let config = CollectorConfig::new("wss://relay.local.example/xrpc/com.atproto.sync.subscribeRepos");
        assert_eq!(
            config.subscribe_url(),
            "wss://relay.local.example/xrpc/com.atproto.sync.subscribeRepos"
        );
    }

    #[test]
    fn subscribe_url_respects_existing_query() {
        let config = CollectorConfig::new("wss://host/subscribe?compress=true").cursor(7);
        assert_eq!(config.subscribe_url(), "wss://host/subscribe?compress=true&cursor=7");
    }
}
