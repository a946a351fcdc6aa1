//! Wiring of stores, providers and services from [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use leadbot_agent::{ConversationOrchestrator, OrchestratorConfig};
use leadbot_crm::{CrmSync, DisabledCrm, OdooClient};
use leadbot_model::{CompletionModel, OpenAIClient, OpenAIConfig};
use leadbot_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, InMemoryKnowledgeStore, IngestionPipeline,
    KnowledgeStore, OpenAIEmbeddingProvider, PgKnowledgeStore, RagConfig, RetrievalService,
    RetryingEmbeddingProvider,
};
use leadbot_session::{InMemoryLeadStore, LeadStore, PgLeadStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::{AppConfig, EmbedderKind};

const EMBEDDING_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything a command needs, built once at start-up.
pub struct Components {
    pub rag_config: RagConfig,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub leads: Arc<dyn LeadStore>,
    pub crm: Arc<dyn CrmSync>,
    /// Shared by both stores when backed by PostgreSQL.
    pub pool: Option<PgPool>,
}

impl Components {
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let rag_config = RagConfig::builder()
            .chunk_size(config.chunk_size)
            .ingest_concurrency(config.ingest_concurrency)
            .build()?;
        let embedder = build_embedder(config)?;

        let pool = match config.database_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(
                PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("failed to connect to DATABASE_URL")?,
            ),
            None => None,
        };

        let knowledge: Arc<dyn KnowledgeStore>;
        let leads: Arc<dyn LeadStore>;
        match &pool {
            Some(pool) => {
                info!(dimensions = embedder.dimensions(), "using PostgreSQL stores");
                knowledge = Arc::new(PgKnowledgeStore::from_pool(pool.clone(), embedder.dimensions()));
                leads = Arc::new(PgLeadStore::from_pool(pool.clone()));
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory stores");
                knowledge = Arc::new(InMemoryKnowledgeStore::new());
                leads = Arc::new(InMemoryLeadStore::new());
            }
        }

        let crm: Arc<dyn CrmSync> = match config.odoo() {
            Some(odoo) => {
                info!(url = %odoo.base_url(), db = %odoo.db, "Odoo CRM sync enabled");
                Arc::new(OdooClient::new(odoo)?)
            }
            None => {
                info!("Odoo not configured, CRM sync disabled");
                Arc::new(DisabledCrm)
            }
        };

        Ok(Self { rag_config, embedder, knowledge, leads, crm, pool })
    }

    /// Create the knowledge and lead schemas.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let Some(pool) = &self.pool else {
            bail!("DATABASE_URL is required to migrate");
        };
        PgKnowledgeStore::from_pool(pool.clone(), self.embedder.dimensions())
            .migrate()
            .await
            .context("knowledge schema migration failed")?;
        PgLeadStore::from_pool(pool.clone()).migrate().await.context("lead schema migration failed")?;
        Ok(())
    }

    pub fn pipeline(&self) -> anyhow::Result<IngestionPipeline> {
        Ok(IngestionPipeline::builder()
            .config(self.rag_config.clone())
            .embedding_provider(self.embedder.clone())
            .knowledge_store(self.knowledge.clone())
            .build()?)
    }

    pub fn retrieval(&self) -> RetrievalService {
        RetrievalService::new(self.embedder.clone(), self.knowledge.clone())
            .with_config(self.rag_config.clone())
    }

    pub fn orchestrator(&self, config: &AppConfig) -> anyhow::Result<ConversationOrchestrator> {
        Ok(ConversationOrchestrator::builder()
            .model(build_chat_model(config)?)
            .retrieval(self.retrieval())
            .lead_store(self.leads.clone())
            .crm(self.crm.clone())
            .config(orchestrator_config(config))
            .build()?)
    }
}

fn orchestrator_config(config: &AppConfig) -> OrchestratorConfig {
    match config.knowledge_source() {
        Some(source) => {
            info!(source, "chat retrieval limited to one knowledge source");
            OrchestratorConfig::default().with_knowledge_source(source)
        }
        None => OrchestratorConfig::default(),
    }
}

fn build_embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.embedder {
        EmbedderKind::Hashing => {
            warn!("using the hashing embedder; retrieval quality is for development only");
            Ok(Arc::new(HashingEmbeddingProvider::new(config.embedding_dimensions)))
        }
        EmbedderKind::Openai => {
            let Some(api_key) = config.api_key() else {
                bail!("OPENAI_API_KEY is required for the OpenAI embedder (or pass --embedder hashing)");
            };
            let mut provider = OpenAIEmbeddingProvider::new(api_key)?
                .with_model(config.embedding_model.as_str())
                .with_dimensions(config.embedding_dimensions);
            if let Some(base) = &config.openai_base_url {
                provider = provider.with_api_base(base.as_str());
            }
            Ok(Arc::new(RetryingEmbeddingProvider::new(Arc::new(provider)).with_timeout(EMBEDDING_TIMEOUT)))
        }
    }
}

fn build_chat_model(config: &AppConfig) -> anyhow::Result<Arc<dyn CompletionModel>> {
    let Some(api_key) = config.api_key() else {
        bail!("OPENAI_API_KEY is required to serve chat");
    };
    let openai = match &config.openai_base_url {
        Some(base) => OpenAIConfig::compatible(api_key, base.as_str(), config.chat_model.as_str()),
        None => OpenAIConfig::new(api_key, config.chat_model.as_str()),
    };
    Ok(Arc::new(OpenAIClient::new(openai)?))
}
