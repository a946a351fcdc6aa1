//! OpenAI chat completions provider.
//!
//! Built on `async-openai` using the tools API. Any OpenAI-compatible
//! server (vLLM, Ollama, Azure behind a proxy) works through
//! [`OpenAIConfig::compatible`].
//!
//! # Example
//!
//! ```rust,ignore
//! use leadbot_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY").unwrap(),
//!     "gpt-4o-mini",
//! ))?;
//! ```

mod client;
mod config;
mod convert;

pub use client::OpenAIClient;
pub use config::{DEFAULT_CHAT_MODEL, OPENAI_API_BASE, OpenAIConfig};
