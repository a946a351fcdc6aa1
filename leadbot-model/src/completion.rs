//! The completion abstraction: request, reply and the model trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::{ChatMessage, FunctionCall};

/// A function the model may call, described by a JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// The function name.
    pub name: String,
    /// What the function does, written for the model.
    pub description: String,
    /// JSON Schema of the argument object.
    pub parameters: Value,
}

impl FunctionSchema {
    /// Create a function schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self { name: name.into(), description: description.into(), parameters }
    }
}

/// A single chat completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The transcript, system message first.
    pub messages: Vec<ChatMessage>,
    /// Functions the model may call. Empty disables function calling.
    pub functions: Vec<FunctionSchema>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request for `messages` with provider defaults.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, ..Self::default() }
    }

    /// Offer `functions` to the model.
    pub fn with_functions(mut self, functions: Vec<FunctionSchema>) -> Self {
        self.functions = functions;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text(String),
    /// A function call, optionally accompanied by text for the visitor.
    FunctionCall {
        /// The requested call.
        call: FunctionCall,
        /// Text the model produced alongside the call, if any.
        text: Option<String>,
    },
}

impl Reply {
    /// The non-blank text of the reply, if any.
    pub fn text(&self) -> Option<&str> {
        let text = match self {
            Reply::Text(text) => Some(text.as_str()),
            Reply::FunctionCall { text, .. } => text.as_deref(),
        };
        text.filter(|t| !t.trim().is_empty())
    }

    /// The function call, if the model made one.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        match self {
            Reply::FunctionCall { call, .. } => Some(call),
            Reply::Text(_) => None,
        }
    }
}

/// A chat completion model with function calling.
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_model::{ChatMessage, CompletionModel, CompletionRequest};
///
/// let request = CompletionRequest::new(vec![ChatMessage::user("Hola")]).with_max_tokens(300);
/// match model.complete(request).await? {
///     Reply::Text(text) => println!("{text}"),
///     Reply::FunctionCall { call, .. } => println!("wants {}", call.name),
/// }
/// ```
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// The model identifier, for logs.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Reply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_no_text() {
        assert_eq!(Reply::Text("  ".into()).text(), None);
        assert_eq!(Reply::Text("Hola".into()).text(), Some("Hola"));

        let call = FunctionCall::new("schedule_meeting", "{}");
        let reply = Reply::FunctionCall { call: call.clone(), text: None };
        assert_eq!(reply.text(), None);
        assert_eq!(reply.function_call(), Some(&call));
    }
}
