//! Error types for the `leadbot-agent` crate.

use leadbot_session::SessionError;
use thiserror::Error;

/// Errors a conversation turn can fail with.
///
/// Retrieval and completion problems never surface here: the turn degrades
/// to an answer without context or to the fallback reply instead.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The request is missing a message or a tenant.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The lead store failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The orchestrator is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// `true` for errors caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, AgentError::Validation(_))
    }
}

/// A convenience result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
