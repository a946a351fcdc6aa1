//! # leadbot-rag
//!
//! Tenant-scoped retrieval-augmented generation for the leadbot sales assistant.
//!
//! ## Overview
//!
//! Knowledge flows through four leaf-first components:
//!
//! - [`Chunker`] / [`SentenceChunker`] - splits documents into sentence-aligned chunks
//! - [`EmbeddingProvider`] - turns text into vectors
//! - [`KnowledgeStore`] - persists chunks and runs tenant-scoped similarity search
//! - [`IngestionPipeline`] and [`RetrievalService`] - compose the above
//!
//! ## Embedding providers
//!
//! | Provider | Feature | Notes |
//! |----------|---------|-------|
//! | [`HashingEmbeddingProvider`] | - | Deterministic, offline |
//! | [`RetryingEmbeddingProvider`] | - | Timeout and backoff decorator |
//! | `OpenAIEmbeddingProvider` | `openai` | `text-embedding-3-small`, 1536 dims |
//!
//! ## Knowledge stores
//!
//! | Store | Feature |
//! |-------|---------|
//! | [`InMemoryKnowledgeStore`] | - |
//! | `PgKnowledgeStore` | `pgvector` |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadbot_rag::*;
//!
//! let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::default());
//! let store: Arc<dyn KnowledgeStore> = Arc::new(InMemoryKnowledgeStore::new());
//!
//! let pipeline = IngestionPipeline::builder()
//!     .embedding_provider(embedder.clone())
//!     .knowledge_store(store.clone())
//!     .build()?;
//! pipeline.ingest_document("Escaneado 3D de precisión.", "tenant-a", &Metadata::new()).await?;
//!
//! let retrieval = RetrievalService::new(embedder, store);
//! let hits = retrieval
//!     .search_knowledge("precisión del escáner", "tenant-a", &retrieval.default_params())
//!     .await;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod inmemory;
pub mod pipeline;
pub mod retrieval;
pub mod retry;
pub mod vector;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{Chunker, SentenceChunker, chunk_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    CHUNK_INDEX_KEY, DocumentSummary, KnowledgeChunk, Metadata, NewKnowledgeChunk, SearchResult,
    TOTAL_CHUNKS_KEY,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashingEmbeddingProvider;
pub use inmemory::InMemoryKnowledgeStore;
pub use pipeline::{IngestReport, IngestionPipeline, IngestionPipelineBuilder};
pub use retrieval::{RetrievalService, SearchParams};
pub use retry::RetryingEmbeddingProvider;
pub use vectorstore::KnowledgeStore;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "pgvector")]
pub use pgvector::PgKnowledgeStore;
