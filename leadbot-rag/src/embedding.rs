//! Turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// Produces fixed-length embeddings for chunks and queries.
///
/// Knowledge is embedded once at ingestion and every query is embedded with
/// the same provider, so both sides must agree on [`dimensions`]. Any failure
/// is a [`RagError::Embedding`](crate::RagError::Embedding); the pipeline
/// never stores a chunk whose embedding failed.
///
/// [`dimensions`]: EmbeddingProvider::dimensions
///
/// # Example
///
/// ```rust,ignore
/// use leadbot_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::new(256);
/// let query = provider.embed("precisión del escáner").await?;
/// assert_eq!(query.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, in order. One call per text unless the backend
    /// batches natively.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
