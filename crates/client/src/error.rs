//! Error types for the deployment client

use thiserror::Error;

/// Result type alias using the client error
pub type Result<T> = std::result::Result<T, ClientError>;

/// Deployment client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("required environment variable {name} is not set ({purpose})")]
    MissingEnv {
        name: &'static str,
        purpose: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {error}: {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("no session: call create_account or login first")]
    NoSession,
}
