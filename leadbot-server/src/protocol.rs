//! Request and response bodies of the HTTP API.
//!
//! Fields are camelCase on the wire. Required request fields are optional
//! here so that a missing field is answered with the API's own 400 body.

use leadbot_rag::{DocumentSummary, Metadata};
use serde::{Deserialize, Serialize};

pub const MISSING_INGEST_FIELDS: &str = "Missing required fields: content, tenantId";
pub const MISSING_CHAT_FIELDS: &str = "Missing required fields: message, tenantId";
pub const TENANT_REQUIRED: &str = "tenantId is required";
pub const INGEST_FAILED: &str = "Failed to ingest document";
pub const DOCUMENTS_FAILED: &str = "Failed to fetch documents";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Default page size of the document listing.
pub const DEFAULT_DOCUMENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub content: Option<String>,
    pub tenant_id: Option<String>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub chunks_created: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsQuery {
    pub tenant_id: Option<String>,
    pub limit: Option<String>,
}

impl DocumentsQuery {
    /// The requested page size; unparsable or zero values fall back to the default.
    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_DOCUMENT_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub tenant_id: Option<String>,
    pub lead_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub lead_id: String,
    pub function_called: Option<String>,
}

/// `Some` only for non-blank values.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
