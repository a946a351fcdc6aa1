//! The conversation orchestrator: one chat turn from visitor message to reply.

use std::sync::Arc;
use std::time::Duration;

use leadbot_crm::{CrmSync, DisabledCrm};
use leadbot_model::{
    ChatMessage, CompletionModel, CompletionRequest, FunctionCall, ModelError, Reply,
};
use leadbot_rag::{Metadata, RetrievalService, SearchParams};
use leadbot_session::{LeadStore, MessageRole, NewMessage, StoredMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::crm_task::{CrmSyncQueue, CrmTask};
use crate::error::{AgentError, Result};
use crate::functions::execute_function;
use crate::prompt::{function_schemas, system_message};

/// Reply used whenever the model produces nothing usable.
pub const FALLBACK_REPLY: &str = "¡Entendido! ¿En qué más puedo ayudarte?";

// ── Configuration ──────────────────────────────────────────────────────────

/// Tuning of a conversation turn.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Filter, threshold and count used for knowledge retrieval. The default
    /// filter is empty, so every chunk of the tenant is eligible.
    pub retrieval: SearchParams,
    /// Number of past messages replayed to the model.
    pub history_limit: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Token budget of the confirmation after a function call.
    pub followup_max_tokens: u32,
    /// Upper bound on each completion call.
    pub completion_timeout: Duration,
    pub fallback_reply: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retrieval: SearchParams::default().with_threshold(0.4).with_count(3),
            history_limit: 20,
            temperature: 0.5,
            max_tokens: 300,
            followup_max_tokens: 50,
            completion_timeout: Duration::from_secs(30),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_retrieval(mut self, retrieval: SearchParams) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Only answer from chunks whose `metadata.source` is `source`.
    pub fn with_knowledge_source(mut self, source: impl Into<String>) -> Self {
        let mut filter = Metadata::new();
        filter.insert("source".to_string(), Value::String(source.into()));
        self.retrieval.filter = filter;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 || self.followup_max_tokens == 0 {
            return Err(AgentError::Config("token budgets must be greater than 0".to_string()));
        }
        if self.completion_timeout.is_zero() {
            return Err(AgentError::Config("completion_timeout must be greater than 0".to_string()));
        }
        if self.fallback_reply.trim().is_empty() {
            return Err(AgentError::Config("fallback_reply must not be empty".to_string()));
        }
        Ok(())
    }
}

// ── Turn types ─────────────────────────────────────────────────────────────

/// A visitor message addressed to a tenant's assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    pub tenant_id: String,
    /// The conversation to continue; `None` starts a new lead.
    pub lead_id: Option<String>,
}

impl TurnRequest {
    pub fn new(tenant_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), tenant_id: tenant_id.into(), lead_id: None }
    }

    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into());
        self
    }
}

/// Something a turn did besides answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    LeadCreated { lead_id: String },
    UserMessageStored,
    AssistantMessageStored,
    FunctionExecuted { name: String, succeeded: bool },
    CrmSyncScheduled { operation: String },
}

/// The answer to a [`TurnRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub lead_id: String,
    pub function_called: Option<String>,
    pub side_effects: Vec<SideEffect>,
}

// ── Orchestrator ───────────────────────────────────────────────────────────

/// Runs chat turns: retrieval, history, completion, sales functions and
/// persistence.
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_agent::{ConversationOrchestrator, TurnRequest};
///
/// let orchestrator = ConversationOrchestrator::builder()
///     .model(model)
///     .retrieval(retrieval)
///     .lead_store(leads)
///     .build()?;
///
/// let outcome = orchestrator.handle_turn(TurnRequest::new("tenant-a", "Hola")).await?;
/// println!("{} ({})", outcome.reply, outcome.lead_id);
/// ```
pub struct ConversationOrchestrator {
    model: Arc<dyn CompletionModel>,
    retrieval: RetrievalService,
    lead_store: Arc<dyn LeadStore>,
    crm: Arc<dyn CrmSync>,
    crm_queue: Arc<CrmSyncQueue>,
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    pub fn builder() -> ConversationOrchestratorBuilder {
        ConversationOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn lead_store(&self) -> &Arc<dyn LeadStore> {
        &self.lead_store
    }

    /// Answer one visitor message.
    ///
    /// # Errors
    ///
    /// [`AgentError::Validation`] for a blank message or tenant and
    /// [`AgentError::Session`] when the lead cannot be resolved. Retrieval,
    /// completion and persistence problems degrade the reply instead.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let TurnRequest { message, tenant_id, lead_id } = request;
        if message.trim().is_empty() || tenant_id.trim().is_empty() {
            return Err(AgentError::Validation(
                "Missing required fields: message, tenantId".to_string(),
            ));
        }

        let mut side_effects = Vec::new();
        let lead_id = self.resolve_lead(&tenant_id, lead_id.as_deref(), &mut side_effects).await?;

        let (knowledge, history) = tokio::join!(
            self.retrieval.search_knowledge(&message, &tenant_id, &self.config.retrieval),
            self.lead_store.recent_messages(&tenant_id, &lead_id, self.config.history_limit),
        );
        let history = history.unwrap_or_else(|e| {
            warn!(%tenant_id, %lead_id, error = %e, "history unavailable, answering without it");
            Vec::new()
        });
        debug!(%lead_id, context_chunks = knowledge.len(), history = history.len(), "prompt assembled");

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_message(&knowledge)));
        messages.extend(history.iter().map(to_chat_message));
        messages.push(ChatMessage::user(message.as_str()));

        let request = CompletionRequest::new(messages.clone())
            .with_functions(function_schemas())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let (reply, stored) = tokio::join!(
            self.complete(request),
            self.lead_store.append_message(NewMessage::user(&tenant_id, &lead_id, message.as_str())),
        );
        match stored {
            Ok(_) => side_effects.push(SideEffect::UserMessageStored),
            Err(e) => error!(%tenant_id, %lead_id, error = %e, "failed to store user message"),
        }

        let mut function_called = None;
        let text = match reply {
            Ok(Reply::Text(text)) => Some(text),
            Ok(Reply::FunctionCall { call, text }) => {
                function_called = Some(call.name.clone());
                let outcome = execute_function(self.lead_store.as_ref(), &tenant_id, &lead_id, &call).await;
                side_effects.push(SideEffect::FunctionExecuted {
                    name: call.name.clone(),
                    succeeded: outcome.succeeded,
                });
                if let Some(task) = outcome.crm_task {
                    self.spawn_crm_sync(&tenant_id, &lead_id, task, &mut side_effects);
                }

                match text.filter(|t| !t.trim().is_empty()) {
                    Some(text) => Some(text),
                    None => self.confirm_function(messages, call, &outcome.result).await,
                }
            }
            Err(e) => {
                warn!(%tenant_id, %lead_id, error = %e, "completion failed, using fallback reply");
                None
            }
        };

        let reply = text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.config.fallback_reply.clone());

        let assistant = NewMessage::assistant(&tenant_id, &lead_id, reply.as_str(), function_called.clone());
        match self.lead_store.append_message(assistant).await {
            Ok(_) => side_effects.push(SideEffect::AssistantMessageStored),
            Err(e) => error!(%tenant_id, %lead_id, error = %e, "failed to store assistant reply"),
        }

        info!(
            %tenant_id,
            %lead_id,
            function_called = function_called.as_deref().unwrap_or("none"),
            "turn completed"
        );
        Ok(TurnOutcome { reply, lead_id, function_called, side_effects })
    }

    /// Reuse the lead if it exists for the tenant, otherwise start a new one.
    async fn resolve_lead(
        &self,
        tenant_id: &str,
        lead_id: Option<&str>,
        side_effects: &mut Vec<SideEffect>,
    ) -> Result<String> {
        if let Some(lead_id) = lead_id.filter(|id| !id.trim().is_empty()) {
            if let Some(lead) = self.lead_store.get_lead(tenant_id, lead_id).await? {
                return Ok(lead.id);
            }
            warn!(tenant_id, lead_id, "unknown lead id, starting a new lead");
        }

        let lead = self.lead_store.create_lead(tenant_id).await.map_err(|e| {
            error!(tenant_id, error = %e, "failed to create lead");
            e
        })?;
        info!(tenant_id, lead_id = %lead.id, "lead created");
        side_effects.push(SideEffect::LeadCreated { lead_id: lead.id.clone() });
        Ok(lead.id)
    }

    async fn complete(&self, request: CompletionRequest) -> leadbot_model::Result<Reply> {
        let timeout = self.config.completion_timeout;
        match tokio::time::timeout(timeout, self.model.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout)),
        }
    }

    /// Ask the model to confirm a function result in its own words.
    async fn confirm_function(
        &self,
        mut messages: Vec<ChatMessage>,
        call: FunctionCall,
        result: &Value,
    ) -> Option<String> {
        let result_message = ChatMessage::function_result(&call, result.to_string());
        messages.push(ChatMessage::assistant_function_call(call, None));
        messages.push(result_message);

        let request =
            CompletionRequest::new(messages).with_max_tokens(self.config.followup_max_tokens);
        match self.complete(request).await {
            Ok(reply) => reply.text().map(str::to_string),
            Err(e) => {
                warn!(error = %e, "confirmation completion failed");
                None
            }
        }
    }

    fn spawn_crm_sync(
        &self,
        tenant_id: &str,
        lead_id: &str,
        task: CrmTask,
        side_effects: &mut Vec<SideEffect>,
    ) {
        if !self.crm.is_configured() {
            debug!(operation = task.operation(), "CRM not configured, skipping sync");
            return;
        }
        side_effects.push(SideEffect::CrmSyncScheduled { operation: task.operation().to_string() });
        let crm = Arc::clone(&self.crm);
        let store = Arc::clone(&self.lead_store);
        let queue = Arc::clone(&self.crm_queue);
        let (tenant_id, lead_id) = (tenant_id.to_string(), lead_id.to_string());
        tokio::spawn(async move {
            queue.run(crm.as_ref(), store.as_ref(), &tenant_id, &lead_id, task).await;
        });
    }
}

fn to_chat_message(message: &StoredMessage) -> ChatMessage {
    match message.role {
        MessageRole::User => ChatMessage::user(message.content.as_str()),
        MessageRole::Assistant => ChatMessage::assistant(message.content.as_str()),
    }
}

// ── Builder ────────────────────────────────────────────────────────────────

/// Builder for [`ConversationOrchestrator`].
#[derive(Default)]
pub struct ConversationOrchestratorBuilder {
    model: Option<Arc<dyn CompletionModel>>,
    retrieval: Option<RetrievalService>,
    lead_store: Option<Arc<dyn LeadStore>>,
    crm: Option<Arc<dyn CrmSync>>,
    config: Option<OrchestratorConfig>,
}

impl ConversationOrchestratorBuilder {
    pub fn model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn retrieval(mut self, retrieval: RetrievalService) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn lead_store(mut self, lead_store: Arc<dyn LeadStore>) -> Self {
        self.lead_store = Some(lead_store);
        self
    }

    /// Defaults to [`DisabledCrm`].
    pub fn crm(mut self, crm: Arc<dyn CrmSync>) -> Self {
        self.crm = Some(crm);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the model, retrieval service or lead
    /// store is missing, or the config is invalid.
    pub fn build(self) -> Result<ConversationOrchestrator> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("completion model is required".to_string()))?;
        let retrieval = self
            .retrieval
            .ok_or_else(|| AgentError::Config("retrieval service is required".to_string()))?;
        let lead_store = self
            .lead_store
            .ok_or_else(|| AgentError::Config("lead store is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(ConversationOrchestrator {
            model,
            retrieval,
            lead_store,
            crm: self.crm.unwrap_or_else(|| Arc::new(DisabledCrm)),
            crm_queue: Arc::new(CrmSyncQueue::new()),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_sales_widget() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.retrieval.threshold, 0.4);
        assert_eq!(config.retrieval.count, 3);
        assert!(config.retrieval.filter.is_empty());
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.followup_max_tokens, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn knowledge_source_narrows_retrieval() {
        let config = OrchestratorConfig::default().with_knowledge_source("Real to Digital KB");
        assert_eq!(config.retrieval.filter.get("source"), Some(&Value::from("Real to Digital KB")));
        assert_eq!(config.retrieval.threshold, 0.4);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = OrchestratorConfig::default().with_completion_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }
}
