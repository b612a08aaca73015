//! Skywatch E2E scenarios
//!
//! Scenario suites that exercise a running deployment end to end: commits
//! created on the origin server must propagate through the relay to the
//! downstream distribution stream, survive an origin-server restart, and
//! show up in the browser client.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Live scenario runner (tests/live.rs)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  scenario::propagation                                      │
//! │    ├── Collector × 3 (origin / relay / distribution)        │
//! │    ├── PdsClient: register account, create post             │
//! │    └── CommitMatcher over all three buffers                 │
//! │  scenario::reconnection                                     │
//! │    ├── Collector + SyntheticPoster                          │
//! │    ├── docker::restart_container("pds")                     │
//! │    └── posts-vs-events counting heuristic                   │
//! │  browser::SocialAppDriver                                   │
//! │    └── Playwright script per flow, run via node             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod docker;
pub mod error;
pub mod scenario;

pub use browser::{BrowserConfig, SocialAppDriver};
pub use error::{E2eError, E2eResult};
pub use scenario::ScenarioReport;
