//! In-memory knowledge store using cosine similarity.
//!
//! This module provides [`InMemoryKnowledgeStore`], a zero-dependency store
//! backed by per-tenant `Vec`s behind a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{
    CHUNK_INDEX_KEY, DocumentSummary, KnowledgeChunk, Metadata, NewKnowledgeChunk, SearchResult,
};
use crate::error::{RagError, Result};
use crate::vector::{cosine_similarity, metadata_matches};
use crate::vectorstore::KnowledgeStore;

const BACKEND: &str = "InMemory";

/// An in-memory knowledge store partitioned by tenant.
///
/// Partitions are stored as tenant id → chunks in insertion order. A search
/// only ever reads the partition of the requested tenant. Ties in similarity
/// keep insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_rag::{InMemoryKnowledgeStore, KnowledgeStore};
///
/// let store = InMemoryKnowledgeStore::new();
/// let id = store.insert(chunk).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    tenants: RwLock<HashMap<String, Vec<KnowledgeChunk>>>,
}

impl InMemoryKnowledgeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of chunks stored for `tenant_id`.
    pub async fn len(&self, tenant_id: &str) -> usize {
        self.tenants.read().await.get(tenant_id).map_or(0, Vec::len)
    }

    /// Return `true` if `tenant_id` has no chunks.
    pub async fn is_empty(&self, tenant_id: &str) -> bool {
        self.len(tenant_id).await == 0
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn insert(&self, chunk: NewKnowledgeChunk) -> Result<String> {
        if chunk.tenant_id.trim().is_empty() {
            return Err(RagError::store_write(BACKEND, "tenant_id must not be empty"));
        }
        if chunk.content.trim().is_empty() {
            return Err(RagError::store_write(BACKEND, "content must not be empty"));
        }
        if chunk.embedding.is_empty() {
            return Err(RagError::store_write(BACKEND, "embedding must not be empty"));
        }

        let mut tenants = self.tenants.write().await;
        let partition = tenants.entry(chunk.tenant_id.clone()).or_default();
        if let Some(existing) = partition.first() {
            if existing.embedding.len() != chunk.embedding.len() {
                return Err(RagError::store_write(
                    BACKEND,
                    format!(
                        "expected {} dimensions, not {}",
                        existing.embedding.len(),
                        chunk.embedding.len()
                    ),
                ));
            }
        }

        let id = Uuid::new_v4().to_string();
        partition.push(KnowledgeChunk {
            id: id.clone(),
            tenant_id: chunk.tenant_id,
            content: chunk.content,
            embedding: chunk.embedding,
            metadata: chunk.metadata,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        tenant_id: &str,
        metadata_filter: &Metadata,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<SearchResult>> {
        let tenants = self.tenants.read().await;
        let Some(partition) = tenants.get(tenant_id) else {
            return Ok(Vec::new());
        };

        if let Some(chunk) = partition.iter().find(|c| c.embedding.len() != query_embedding.len()) {
            return Err(RagError::store_read(
                BACKEND,
                format!(
                    "query has {} dimensions, stored chunks have {}",
                    query_embedding.len(),
                    chunk.embedding.len()
                ),
            ));
        }

        let mut scored: Vec<SearchResult> = partition
            .iter()
            .filter(|chunk| metadata_matches(&chunk.metadata, metadata_filter))
            .map(|chunk| SearchResult {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                similarity: cosine_similarity(&chunk.embedding, query_embedding),
                metadata: chunk.metadata.clone(),
            })
            .filter(|result| result.similarity > match_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(match_count);
        Ok(scored)
    }

    async fn list_documents(&self, tenant_id: &str, limit: usize) -> Result<Vec<DocumentSummary>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .map(|partition| partition.iter().rev().take(limit).map(DocumentSummary::from).collect())
            .unwrap_or_default())
    }

    async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<KnowledgeChunk>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(tenant_id).and_then(|p| p.iter().find(|c| c.id == id)).cloned())
    }

    async fn chunk_indexes(&self, tenant_id: &str, metadata_filter: &Metadata) -> Result<Vec<u64>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .map(|partition| {
                partition
                    .iter()
                    .filter(|c| metadata_matches(&c.metadata, metadata_filter))
                    .filter_map(|c| c.metadata.get(CHUNK_INDEX_KEY).and_then(|v| v.as_u64()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
