//! Error types for the stream collector

use thiserror::Error;

/// Result type alias using the collector error
pub type Result<T> = std::result::Result<T, StreamError>;

/// Stream collector error types
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connection timeout after {seconds}s waiting for open")]
    ConnectTimeout { seconds: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("collector already started")]
    AlreadyStarted,
}
