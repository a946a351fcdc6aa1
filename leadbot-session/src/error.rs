//! Error types for the `leadbot-session` crate.

use thiserror::Error;

/// Errors raised by a [`LeadStore`](crate::LeadStore).
#[derive(Debug, Error)]
pub enum SessionError {
    /// No lead with this id exists for the tenant.
    #[error("Lead not found: {lead_id}")]
    NotFound {
        /// The requested lead id.
        lead_id: String,
    },

    /// The input violates a store constraint.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store failed.
    #[error("Store error ({backend}): {message}")]
    Backend {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
