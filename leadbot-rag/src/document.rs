//! Data types for knowledge chunks, search results, and document listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open JSON metadata attached to a knowledge chunk.
///
/// Used for provenance (`source`, `chunk_index`, `total_chunks`) and as a
/// containment filter during retrieval.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key recording a chunk's position within its source document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key recording how many chunks the source document produced.
pub const TOTAL_CHUNKS_KEY: &str = "total_chunks";

/// A unit of retrievable content owned by one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeChunk {
    /// Store-assigned identifier.
    pub id: String,
    /// The owning tenant. Every store operation is scoped by this value.
    pub tenant_id: String,
    /// The chunk's text.
    pub content: String,
    /// The vector embedding, produced once at ingestion time.
    pub embedding: Vec<f32>,
    /// Provenance and filter metadata.
    pub metadata: Metadata,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

/// A [`KnowledgeChunk`] that has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewKnowledgeChunk {
    /// The owning tenant.
    pub tenant_id: String,
    /// The chunk's text.
    pub content: String,
    /// The vector embedding for `content`.
    pub embedding: Vec<f32>,
    /// Provenance and filter metadata.
    pub metadata: Metadata,
}

/// A retrieved chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The chunk identifier.
    pub id: String,
    /// The chunk's text.
    pub content: String,
    /// Cosine similarity to the query embedding (higher is more relevant).
    pub similarity: f32,
    /// The chunk's metadata.
    pub metadata: Metadata,
}

/// A stored chunk as shown in document listings (no content or embedding).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// The chunk identifier.
    pub id: String,
    /// The chunk's metadata.
    pub metadata: Metadata,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&KnowledgeChunk> for DocumentSummary {
    fn from(chunk: &KnowledgeChunk) -> Self {
        Self { id: chunk.id.clone(), metadata: chunk.metadata.clone(), created_at: chunk.created_at }
    }
}
