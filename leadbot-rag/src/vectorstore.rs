//! Knowledge store trait: tenant-scoped persistence and similarity search.

use async_trait::async_trait;

use crate::document::{DocumentSummary, KnowledgeChunk, Metadata, NewKnowledgeChunk, SearchResult};
use crate::error::Result;

/// A storage backend for tenant-owned knowledge chunks with similarity search.
///
/// Tenant scoping is part of every query an implementation runs: a search for
/// tenant A must never be able to see tenant B's rows, even if the caller
/// later forgets to filter. Chunks are immutable once inserted.
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_rag::{InMemoryKnowledgeStore, KnowledgeStore, Metadata};
///
/// let store = InMemoryKnowledgeStore::new();
/// let id = store.insert(new_chunk).await?;
/// let results = store.search(&query_embedding, "tenant-a", &Metadata::new(), 0.35, 5).await?;
/// ```
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Persist a chunk and return its store-assigned id.
    ///
    /// Fails with [`RagError::StoreWrite`](crate::RagError::StoreWrite) on a
    /// constraint violation or connectivity failure.
    async fn insert(&self, chunk: NewKnowledgeChunk) -> Result<String>;

    /// Return the tenant's chunks whose metadata contains `metadata_filter`
    /// and whose cosine similarity to `query_embedding` is strictly greater
    /// than `match_threshold`, best first, at most `match_count` of them.
    ///
    /// "Nothing relevant" is an empty `Vec`, not an error.
    async fn search(
        &self,
        query_embedding: &[f32],
        tenant_id: &str,
        metadata_filter: &Metadata,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<SearchResult>>;

    /// List the tenant's chunks, newest first.
    async fn list_documents(&self, tenant_id: &str, limit: usize) -> Result<Vec<DocumentSummary>>;

    /// Fetch a single chunk of the tenant by id.
    async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<KnowledgeChunk>>;

    /// Return the `chunk_index` values recorded on the tenant's chunks whose
    /// metadata contains `metadata_filter`.
    async fn chunk_indexes(&self, tenant_id: &str, metadata_filter: &Metadata) -> Result<Vec<u64>>;
}
