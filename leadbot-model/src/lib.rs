//! # leadbot-model
//!
//! Chat completion models with function calling for leadbot.
//!
//! ## Overview
//!
//! - [`CompletionModel`] - the async trait the conversation orchestrator talks to
//! - [`Reply`] - a completion outcome: plain text, or a function call with optional text
//! - [`OpenAIClient`] - OpenAI and OpenAI-compatible chat completions (feature `openai`)
//! - [`MockCompletionModel`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leadbot_model::openai::{OpenAIClient, OpenAIConfig};
//! use leadbot_model::{ChatMessage, CompletionModel, CompletionRequest};
//!
//! let model = OpenAIClient::new(OpenAIConfig::new(api_key, "gpt-4o-mini"))?;
//! let reply = model
//!     .complete(CompletionRequest::new(vec![ChatMessage::user("Hola")]).with_temperature(0.5))
//!     .await?;
//! ```

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use completion::{CompletionModel, CompletionRequest, FunctionSchema, Reply};
pub use error::{ModelError, Result};
pub use message::{ChatMessage, FunctionCall, Role};
pub use mock::MockCompletionModel;
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
