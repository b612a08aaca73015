//! Skywatch deployment client
//!
//! Outbound collaborator calls for the verification suites: account
//! registration, record creation, profile writes, and feed reads against a
//! running deployment's origin server, plus the environment-variable
//! configuration that selects the target deployment and the synthetic post
//! generator used by the reconnection scenario.

pub mod agent;
pub mod config;
pub mod error;
pub mod generator;

pub use agent::{PdsClient, RecordRef, Session};
pub use config::Deployment;
pub use error::{ClientError, Result};
pub use generator::SyntheticPoster;
