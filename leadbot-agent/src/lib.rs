//! # leadbot-agent
//!
//! The sales assistant's conversation engine.
//!
//! A turn resolves the lead, retrieves tenant knowledge and recent history
//! concurrently, asks the completion model for a reply with the sales
//! functions available, executes any requested function against the lead
//! store, and hands CRM synchronization to a background task.
//!
//! - [`ConversationOrchestrator`] - runs a chat turn
//! - [`execute_function`] - the sales functions
//! - [`prompt`] - persona, examples and function schemas

pub mod crm_task;
pub mod error;
pub mod functions;
pub mod orchestrator;
pub mod prompt;

pub use crm_task::{CrmSyncQueue, CrmTask, run_crm_task};
pub use error::{AgentError, Result};
pub use functions::{FunctionOutcome, execute_function, parse_meeting_date, qualification_score};
pub use orchestrator::{
    ConversationOrchestrator, ConversationOrchestratorBuilder, FALLBACK_REPLY, OrchestratorConfig,
    SideEffect, TurnOutcome, TurnRequest,
};
