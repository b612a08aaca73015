//! Error types for E2E scenarios

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("stream error: {0}")]
    Stream(#[from] skywatch_stream::StreamError),

    #[error("client error: {0}")]
    Client(#[from] skywatch_client::ClientError),

    #[error("expectation failed: {0}")]
    Expectation(String),

    #[error("container control failed: {0}")]
    Container(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
