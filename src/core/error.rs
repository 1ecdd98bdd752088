//! Failure taxonomy for quote retrieval

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error")]
    TransportError(#[source] BoxError),

    #[error("Unexpected HTTP status: {0}")]
    BadStatus(u16),

    #[error("Failed to decode response: {0}")]
    DecodeError(String),
}

impl FetchError {
    /// Renders the error together with every underlying cause, e.g.
    /// `Transport error: error sending request: connection refused`.
    pub fn describe(&self) -> String {
        let mut description = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            description.push_str(": ");
            description.push_str(&cause.to_string());
            source = cause.source();
        }
        description
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::TransportError(Box::new(err))
    }
}
