//! # leadbot-server
//!
//! HTTP surface of the sales assistant:
//!
//! - `POST /api/rag/ingest` - chunk, embed and store a document
//! - `GET /api/rag/ingest?tenantId=&limit=` - newest stored chunks of a tenant
//! - `POST /api/chat` - one conversation turn
//! - `GET /health`

pub mod error;
pub mod protocol;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, ServerConfig, app_router, run_server};
