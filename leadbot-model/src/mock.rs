//! Scripted completion model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::completion::{CompletionModel, CompletionRequest, Reply};
use crate::error::{ModelError, Result};
use crate::message::FunctionCall;

/// A [`CompletionModel`] that replays scripted replies in order and records
/// every request it receives.
///
/// Once the script is exhausted every call fails with
/// [`ModelError::Response`].
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_model::{CompletionModel, CompletionRequest, MockCompletionModel, Reply};
///
/// let model = MockCompletionModel::new("mock").with_text("¡Hola!");
/// let reply = model.complete(CompletionRequest::default()).await.unwrap();
/// assert_eq!(reply, Reply::Text("¡Hola!".into()));
/// assert_eq!(model.requests().len(), 1);
/// ```
#[derive(Debug)]
pub struct MockCompletionModel {
    name: String,
    script: Mutex<VecDeque<Result<Reply>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockCompletionModel {
    /// Create a mock with an empty script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queue a reply.
    pub fn with_reply(self, reply: Reply) -> Self {
        self.push(Ok(reply));
        self
    }

    /// Queue a plain text reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(Reply::Text(text.into()))
    }

    /// Queue a function call reply without accompanying text.
    pub fn with_function_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let call_id = format!("call_{}", self.script_len());
        self.with_reply(Reply::FunctionCall {
            call: FunctionCall::new(name, arguments.to_string()).with_id(call_id),
            text: None,
        })
    }

    /// Queue a failure.
    pub fn with_error(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, entry: Result<Reply>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    fn script_len(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionModel for MockCompletionModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Reply> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());
        next.unwrap_or_else(|| {
            Err(ModelError::Response {
                provider: self.name.clone(),
                message: "script exhausted".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::message::ChatMessage;

    #[tokio::test]
    async fn replays_script_in_order_then_fails() {
        let model = MockCompletionModel::new("mock")
            .with_function_call("qualify_lead", json!({"budget": ">50k"}))
            .with_text("Listo");

        let first = model.complete(CompletionRequest::new(vec![ChatMessage::user("a")])).await.unwrap();
        assert_eq!(first.function_call().map(|c| c.name.as_str()), Some("qualify_lead"));
        assert_eq!(first.function_call().and_then(|c| c.id.as_deref()), Some("call_0"));

        let second = model.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(second, Reply::Text("Listo".into()));

        assert!(matches!(
            model.complete(CompletionRequest::default()).await,
            Err(ModelError::Response { .. })
        ));
        assert_eq!(model.requests().len(), 3);
        assert_eq!(model.requests()[0].messages[0].content, "a");
    }
}
