//! Target deployment selection
//!
//! `DOMAIN` and `PARTITION` select the deployment under test. Scripts that
//! gate pipelines use the strict constructor, where a missing variable is a
//! fatal, descriptive error; interactive diagnostics fall back to the
//! documented defaults.

use crate::error::{ClientError, Result};

pub const DOMAIN_VAR: &str = "DOMAIN";
pub const PARTITION_VAR: &str = "PARTITION";

pub const DEFAULT_DOMAIN: &str = "u-at-proto.work";
pub const DEFAULT_PARTITION: &str = "local";

/// One deployment partition: the set of services at
/// `<service>.<partition>.<domain>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub domain: String,
    pub partition: String,
}

impl Deployment {
    pub fn new(domain: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            partition: partition.into(),
        }
    }

    /// Strict mode: both variables are required.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require(DOMAIN_VAR)?, require(PARTITION_VAR)?))
    }

    /// Lenient mode: fall back to the given defaults.
    pub fn from_env_or(domain: &str, partition: &str) -> Self {
        Self::new(
            std::env::var(DOMAIN_VAR).unwrap_or_else(|_| domain.to_string()),
            std::env::var(PARTITION_VAR).unwrap_or_else(|_| partition.to_string()),
        )
    }

    /// Lenient mode with the documented defaults.
    pub fn from_env_or_default() -> Self {
        Self::from_env_or(DEFAULT_DOMAIN, DEFAULT_PARTITION)
    }

    fn host(&self, service: &str) -> String {
        format!("{service}.{}.{}", self.partition, self.domain)
    }

    /// Origin server (personal data server) host.
    pub fn pds_host(&self) -> String {
        self.host("pds")
    }

    pub fn relay_host(&self) -> String {
        self.host("relay")
    }

    /// Downstream event-distribution host.
    pub fn jetstream_host(&self) -> String {
        self.host("jetstream")
    }

    /// Browser client host.
    pub fn social_host(&self) -> String {
        self.host("social")
    }

    pub fn pds_url(&self) -> String {
        format!("https://{}", self.pds_host())
    }

    pub fn social_url(&self) -> String {
        format!("https://{}", self.social_host())
    }

    /// Firehose subscribe endpoint on the origin server.
    pub fn pds_subscribe_url(&self) -> String {
        format!("wss://{}/xrpc/com.atproto.sync.subscribeRepos", self.pds_host())
    }

    /// Firehose subscribe endpoint on the relay.
    pub fn relay_subscribe_url(&self) -> String {
        format!("wss://{}/xrpc/com.atproto.sync.subscribeRepos", self.relay_host())
    }

    /// Simplified-feed subscribe endpoint on the distribution service.
    pub fn jetstream_subscribe_url(&self) -> String {
        format!("wss://{}/subscribe", self.jetstream_host())
    }
}

fn require(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| ClientError::MissingEnv {
        name,
        purpose: "selects the target deployment",
    })
}
