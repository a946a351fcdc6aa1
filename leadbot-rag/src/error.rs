//! Error types for the `leadbot-rag` crate.

use thiserror::Error;

/// Errors that can occur in knowledge-base operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding service failed or returned an unusable response.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the same call may succeed if repeated (timeouts, rate
        /// limits, server errors).
        transient: bool,
    },

    /// A knowledge record could not be written.
    #[error("Store write error ({backend}): {message}")]
    StoreWrite {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A knowledge query could not be executed.
    #[error("Store read error ({backend}): {message}")]
    StoreRead {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An unexpected failure in ingestion or retrieval orchestration.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl RagError {
    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.to_string(), message: message.into(), transient: false }
    }

    pub(crate) fn transient_embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.to_string(), message: message.into(), transient: true }
    }

    pub(crate) fn store_write(backend: &str, message: impl Into<String>) -> Self {
        Self::StoreWrite { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn store_read(backend: &str, message: impl Into<String>) -> Self {
        Self::StoreRead { backend: backend.to_string(), message: message.into() }
    }

    /// `true` when retrying the failed call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Embedding { transient: true, .. })
    }
}

/// A convenience result type for knowledge-base operations.
pub type Result<T> = std::result::Result<T, RagError>;
