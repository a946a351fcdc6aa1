//! Error types for the `leadbot-crm` crate.

use thiserror::Error;

/// Errors raised while talking to a CRM.
#[derive(Debug, Error)]
pub enum CrmError {
    /// No CRM is configured.
    #[error("CRM is not configured")]
    NotConfigured,

    /// The CRM rejected the credentials.
    #[error("CRM authentication failed: {0}")]
    Auth(String),

    /// The HTTP request failed.
    #[error("CRM request failed: {0}")]
    Request(String),

    /// The CRM answered with an error or an unexpected payload.
    #[error("CRM call {call} failed: {message}")]
    Rpc {
        /// The remote call, e.g. `crm.lead.create`.
        call: String,
        /// The CRM's error message.
        message: String,
    },

    /// A CRM id was not in the format the backend uses.
    #[error("Invalid CRM id '{0}'")]
    InvalidId(String),
}

/// A convenience result type for CRM operations.
pub type Result<T> = std::result::Result<T, CrmError>;
