//! OpenAI client configuration.

use serde::{Deserialize, Serialize};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Configuration for [`OpenAIClient`](super::OpenAIClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Bearer token.
    pub api_key: String,
    /// Model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Optional organization header.
    pub organization_id: Option<String>,
    /// Override for OpenAI-compatible servers.
    pub base_url: Option<String>,
}

impl OpenAIConfig {
    /// Configuration for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), organization_id: None, base_url: None }
    }

    /// Configuration for an OpenAI-compatible API at `base_url`.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { base_url: Some(base_url.into()), ..Self::new(api_key, model) }
    }

    /// Set the organization id.
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// The base URL requests are sent to, without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_BASE).trim_end_matches('/')
    }
}
