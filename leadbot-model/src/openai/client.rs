//! OpenAI client implementation.

use async_openai::{Client, config::OpenAIConfig as AsyncOpenAIConfig};
use async_trait::async_trait;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use super::convert::{self, PROVIDER};
use crate::completion::{CompletionModel, CompletionRequest, Reply};
use crate::error::{ModelError, Result};

/// OpenAI client for the standard OpenAI API and OpenAI-compatible APIs.
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(ModelError::Config("model must not be empty".to_string()));
        }

        let mut openai_config =
            AsyncOpenAIConfig::new().with_api_key(&config.api_key).with_api_base(config.api_base());
        if let Some(org_id) = &config.organization_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        Ok(Self { client: Client::with_config(openai_config), config })
    }

    /// Create a client for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::new(OpenAIConfig::compatible(api_key, base_url, model))
    }
}

#[async_trait]
impl CompletionModel for OpenAIClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Reply> {
        let openai_request = convert::to_openai_request(&self.config.model, &request).map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to build request");
            convert::to_model_error(e)
        })?;
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            messages = request.messages.len(),
            functions = request.functions.len(),
            "requesting chat completion"
        );

        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "chat completion failed");
            convert::to_model_error(e)
        })?;

        convert::from_openai_response(response).ok_or_else(|| ModelError::Response {
            provider: PROVIDER.to_string(),
            message: "response contained no choices".to_string(),
        })
    }
}
