//! Knowledge ingestion pipeline.
//!
//! The [`IngestionPipeline`] turns raw document text into stored knowledge
//! chunks by composing a [`Chunker`], an [`EmbeddingProvider`] and a
//! [`KnowledgeStore`]. Ingestion is best effort: a chunk that fails to embed
//! or store is logged and skipped, and the rest of the document still lands.
//!
//! # Example
//!
//! ```rust,ignore
//! use leadbot_rag::{IngestionPipeline, InMemoryKnowledgeStore, Metadata, RagConfig};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .knowledge_store(Arc::new(InMemoryKnowledgeStore::new()))
//!     .build()?;
//!
//! let stored = pipeline.ingest_document(&text, "tenant-a", &Metadata::new()).await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use futures::{StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::RagConfig;
use crate::document::{CHUNK_INDEX_KEY, Metadata, NewKnowledgeChunk, TOTAL_CHUNKS_KEY};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::KnowledgeStore;

/// Per-chunk outcome of ingesting one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Number of chunks the document was split into.
    pub total_chunks: usize,
    /// `(chunk_index, id)` for every chunk that was stored, in index order.
    pub stored: Vec<(usize, String)>,
    /// `(chunk_index, reason)` for every chunk that failed, in index order.
    pub failed: Vec<(usize, String)>,
}

impl IngestReport {
    /// Number of chunks stored by this run.
    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }

    /// `true` when no chunk failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Chunk → embed → store, per document, scoped to one tenant.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn KnowledgeStore>,
    chunker: Arc<dyn Chunker>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the knowledge store.
    pub fn knowledge_store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    /// Ingest a document and return how many chunks were stored.
    ///
    /// Every chunk receives the caller's `metadata` plus `chunk_index` and
    /// `total_chunks`. Failed chunks are logged and not counted; nothing is
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Pipeline`] if `tenant_id` is blank.
    pub async fn ingest_document(
        &self,
        content: &str,
        tenant_id: &str,
        metadata: &Metadata,
    ) -> Result<usize> {
        self.ingest_document_detailed(content, tenant_id, metadata).await.map(|r| r.stored_count())
    }

    /// Like [`ingest_document`](Self::ingest_document), but reports which
    /// chunks were stored and which failed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Pipeline`] if `tenant_id` is blank.
    pub async fn ingest_document_detailed(
        &self,
        content: &str,
        tenant_id: &str,
        metadata: &Metadata,
    ) -> Result<IngestReport> {
        ensure_tenant(tenant_id)?;

        let chunks = self.chunker.chunk(content);
        let total = chunks.len();
        let report = self.ingest_chunks(tenant_id, metadata, total, chunks.into_iter().enumerate()).await;

        info!(
            tenant_id,
            total_chunks = total,
            stored = report.stored.len(),
            failed = report.failed.len(),
            "ingested document"
        );
        Ok(report)
    }

    /// Ingest only the chunks of `content` that are not already stored.
    ///
    /// The document is re-chunked with the current configuration. Chunks
    /// already present are those of the tenant whose metadata contains
    /// `metadata` and the same `total_chunks`; their `chunk_index` values are
    /// skipped. Use this to repair a document after a partial ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Pipeline`] if `tenant_id` is blank, or the store's
    /// error if existing chunks cannot be listed.
    pub async fn reingest_missing(
        &self,
        content: &str,
        tenant_id: &str,
        metadata: &Metadata,
    ) -> Result<IngestReport> {
        ensure_tenant(tenant_id)?;

        let chunks = self.chunker.chunk(content);
        let total = chunks.len();
        if total == 0 {
            return Ok(IngestReport::default());
        }

        let mut filter = metadata.clone();
        filter.insert(TOTAL_CHUNKS_KEY.to_string(), Value::from(total));
        let existing: HashSet<u64> = self
            .store
            .chunk_indexes(tenant_id, &filter)
            .await
            .map_err(|e| {
                error!(tenant_id, error = %e, "failed to list existing chunks");
                e
            })?
            .into_iter()
            .collect();

        let missing = chunks.into_iter().enumerate().filter(|(i, _)| !existing.contains(&(*i as u64)));
        let report = self.ingest_chunks(tenant_id, metadata, total, missing).await;

        info!(
            tenant_id,
            total_chunks = total,
            already_present = existing.len(),
            stored = report.stored.len(),
            failed = report.failed.len(),
            "re-ingested missing chunks"
        );
        Ok(report)
    }

    async fn ingest_chunks(
        &self,
        tenant_id: &str,
        metadata: &Metadata,
        total: usize,
        chunks: impl Iterator<Item = (usize, String)>,
    ) -> IngestReport {
        let mut outcomes: Vec<(usize, Result<String>)> = stream::iter(chunks)
            .map(|(index, content)| async move {
                let outcome = self.ingest_chunk(tenant_id, metadata, index, total, content).await;
                (index, outcome)
            })
            .buffer_unordered(self.config.ingest_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = IngestReport { total_chunks: total, ..IngestReport::default() };
        for (index, outcome) in outcomes {
            match outcome {
                Ok(id) => report.stored.push((index, id)),
                Err(e) => {
                    error!(tenant_id, chunk_index = index, error = %e, "failed to ingest chunk");
                    report.failed.push((index, e.to_string()));
                }
            }
        }
        report
    }

    async fn ingest_chunk(
        &self,
        tenant_id: &str,
        metadata: &Metadata,
        index: usize,
        total: usize,
        content: String,
    ) -> Result<String> {
        let embedding = self.embedding_provider.embed(&content).await?;

        let mut chunk_metadata = metadata.clone();
        chunk_metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(index));
        chunk_metadata.insert(TOTAL_CHUNKS_KEY.to_string(), Value::from(total));

        let id = self
            .store
            .insert(NewKnowledgeChunk {
                tenant_id: tenant_id.to_string(),
                content,
                embedding,
                metadata: chunk_metadata,
            })
            .await?;
        debug!(tenant_id, chunk_index = index, chunk_id = %id, "stored chunk");
        Ok(id)
    }
}

fn ensure_tenant(tenant_id: &str) -> Result<()> {
    if tenant_id.trim().is_empty() {
        return Err(RagError::Pipeline("tenant_id must not be empty".to_string()));
    }
    Ok(())
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// The embedding provider and knowledge store are required. The config
/// defaults to [`RagConfig::default()`] and the chunker to a
/// [`SentenceChunker`] sized by `config.chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = IngestionPipeline::builder()
///     .embedding_provider(Arc::new(embedder))
///     .knowledge_store(Arc::new(store))
///     .build()?;
/// ```
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn KnowledgeStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the knowledge store backend.
    pub fn knowledge_store(mut self, store: Arc<dyn KnowledgeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default sentence chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config has a zero `ingest_concurrency`.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        if config.ingest_concurrency == 0 {
            return Err(RagError::Config("ingest_concurrency must be greater than zero".to_string()));
        }
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| RagError::Config("knowledge_store is required".to_string()))?;
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(SentenceChunker::new(config.chunk_size)));

        Ok(IngestionPipeline { config, embedding_provider, store, chunker })
    }
}
