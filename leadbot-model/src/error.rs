//! Error types for the `leadbot-model` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while requesting a chat completion.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// The request never produced an HTTP response.
    #[error("Request error ({provider}): {message}")]
    Request {
        /// The model provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider rejected the request.
    #[error("API error ({provider}): {message}")]
    Api {
        /// The model provider.
        provider: String,
        /// The provider's error code, e.g. `rate_limit_exceeded`.
        code: Option<String>,
        /// The provider's error message.
        message: String,
    },

    /// The response body could not be understood.
    #[error("Malformed response ({provider}): {message}")]
    Response {
        /// The model provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion did not finish in time.
    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
