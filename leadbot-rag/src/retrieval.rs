//! Tenant-scoped knowledge retrieval.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::RagConfig;
use crate::document::{Metadata, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::KnowledgeStore;

/// Filter and cut-offs for a single retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Metadata the results must contain. Empty matches everything.
    pub filter: Metadata,
    /// Results must score strictly above this similarity.
    pub threshold: f32,
    /// Maximum number of results.
    pub count: usize,
}

impl SearchParams {
    /// Parameters using the thresholds of `config` and no filter.
    pub fn from_config(config: &RagConfig) -> Self {
        Self { filter: Metadata::new(), threshold: config.match_threshold, count: config.match_count }
    }

    /// Set the metadata containment filter.
    pub fn with_filter(mut self, filter: Metadata) -> Self {
        self.filter = filter;
        self
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the maximum number of results.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Embeds a query and searches the tenant's knowledge.
///
/// [`search_knowledge`](Self::search_knowledge) never fails: a broken
/// embedder or store degrades to "no context", which callers treat the same
/// as an empty knowledge base.
///
/// # Example
///
/// ```rust,ignore
/// let retrieval = RetrievalService::new(embedder, store);
/// let params = retrieval.default_params().with_count(3);
/// let results = retrieval.search_knowledge("precisión del escáner", "tenant-a", &params).await;
/// ```
#[derive(Clone)]
pub struct RetrievalService {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn KnowledgeStore>,
}

impl RetrievalService {
    /// Create a retrieval service with the default [`RagConfig`].
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { config: RagConfig::default(), embedding_provider, store }
    }

    /// Use `config` for default search parameters.
    pub fn with_config(mut self, config: RagConfig) -> Self {
        self.config = config;
        self
    }

    /// Search parameters derived from the configured defaults.
    pub fn default_params(&self) -> SearchParams {
        SearchParams::from_config(&self.config)
    }

    /// Return the tenant's chunks most similar to `query`, or an empty `Vec`
    /// if anything goes wrong.
    pub async fn search_knowledge(
        &self,
        query: &str,
        tenant_id: &str,
        params: &SearchParams,
    ) -> Vec<SearchResult> {
        match self.try_search_knowledge(query, tenant_id, params).await {
            Ok(results) => results,
            Err(e) => {
                error!(tenant_id, error = %e, "knowledge search failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Like [`search_knowledge`](Self::search_knowledge), but surfaces errors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Pipeline`] for a blank tenant, otherwise the
    /// embedder's or store's error.
    pub async fn try_search_knowledge(
        &self,
        query: &str,
        tenant_id: &str,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>> {
        if tenant_id.trim().is_empty() {
            return Err(RagError::Pipeline("tenant_id must not be empty".to_string()));
        }

        let query_embedding = self.embedding_provider.embed(query).await?;
        let results = self
            .store
            .search(&query_embedding, tenant_id, &params.filter, params.threshold, params.count)
            .await?;

        info!(tenant_id, result_count = results.len(), "knowledge search completed");
        Ok(results)
    }
}
