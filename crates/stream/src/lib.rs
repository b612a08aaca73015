//! Skywatch stream collector
//!
//! A reusable event-stream collection harness for verifying a running
//! decentralized social deployment. One `Collector` owns one live
//! subscription to a streaming endpoint (origin server, relay, or a
//! downstream distribution endpoint), deserializes inbound frames into
//! typed events, and records them in an append-only buffer that test code
//! queries with structural matchers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Collector                         │
//! ├──────────────────────────────────────────────────────────┤
//! │  StreamConnection                                        │
//! │    └── connect(url) / deliver frames ──► EventBuffer     │
//! │  ReconnectSupervisor                                     │
//! │    └── backoff, observer callback, terminal exhaustion   │
//! │  EventBuffer                                             │
//! │    └── snapshot / filter / count_since / wait_for        │
//! │  CommitMatcher                                           │
//! │    └── subset match on create/update/delete operations   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Multiple collectors run concurrently and independently, one per
//! endpoint, with no shared state between them.

pub mod buffer;
pub mod collector;
pub mod connection;
pub mod error;
pub mod event;
pub mod frame;
pub mod matcher;
pub mod supervisor;

pub use buffer::EventBuffer;
pub use collector::{Collector, CollectorConfig};
pub use connection::{ConnectionState, StreamConnection};
pub use error::{Result, StreamError};
pub use event::{AccountEvent, CommitEvent, IdentityEvent, OpAction, RepoOp, StreamEvent};
pub use matcher::CommitMatcher;
pub use supervisor::{ReconnectPolicy, SupervisorState};

/// Skywatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
