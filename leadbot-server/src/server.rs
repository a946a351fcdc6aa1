use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use leadbot_agent::{AgentError, ConversationOrchestrator, TurnRequest};
use leadbot_rag::IngestionPipeline;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    error::ApiError,
    protocol::{
        ChatRequest, ChatResponse, DOCUMENTS_FAILED, DocumentsQuery, DocumentsResponse,
        INGEST_FAILED, INTERNAL_ERROR, IngestRequest, IngestResponse, MISSING_CHAT_FIELDS,
        MISSING_INGEST_FIELDS, TENANT_REQUIRED, present,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub orchestrator: Arc<ConversationOrchestrator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(pipeline: Arc<IngestionPipeline>, orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self { pipeline, orchestrator }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 3000 }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/rag/ingest", post(ingest_document).get(list_documents))
        .route("/api/chat", post(chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for leadbot server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("leadbot listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutting down");
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"leadbot"}))
}

async fn ingest_document(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "unreadable ingest request");
        ApiError::validation(MISSING_INGEST_FIELDS)
    })?;
    let (Some(content), Some(tenant_id)) = (present(request.content), present(request.tenant_id))
    else {
        return Err(ApiError::validation(MISSING_INGEST_FIELDS));
    };
    let metadata = request.metadata.unwrap_or_default();

    let chunks_created =
        state.pipeline.ingest_document(&content, &tenant_id, &metadata).await.map_err(|e| {
            error!(%tenant_id, error = %e, "ingest failed");
            ApiError::internal(INGEST_FAILED)
        })?;

    Ok(Json(IngestResponse {
        success: true,
        chunks_created,
        message: format!(
            "Knowledge ingested successfully in {chunks_created} chunks for tenant {tenant_id}"
        ),
    }))
}

async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentsQuery>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let limit = query.limit();
    let Some(tenant_id) = present(query.tenant_id) else {
        return Err(ApiError::validation(TENANT_REQUIRED));
    };

    let documents =
        state.pipeline.knowledge_store().list_documents(&tenant_id, limit).await.map_err(|e| {
            error!(%tenant_id, error = %e, "document listing failed");
            ApiError::internal(DOCUMENTS_FAILED)
        })?;

    Ok(Json(DocumentsResponse { count: documents.len(), documents }))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "unreadable chat request");
        ApiError::validation(MISSING_CHAT_FIELDS)
    })?;
    let (Some(message), Some(tenant_id)) = (present(request.message), present(request.tenant_id))
    else {
        return Err(ApiError::validation(MISSING_CHAT_FIELDS));
    };

    let turn = TurnRequest { message, tenant_id, lead_id: present(request.lead_id) };
    let outcome = state.orchestrator.handle_turn(turn).await.map_err(|e| match e {
        AgentError::Validation(_) => ApiError::validation(MISSING_CHAT_FIELDS),
        other => {
            error!(error = %other, "chat turn failed");
            ApiError::internal_with_details(INTERNAL_ERROR, other.to_string())
        }
    })?;

    Ok(Json(ChatResponse {
        message: outcome.reply,
        lead_id: outcome.lead_id,
        function_called: outcome.function_called,
    }))
}
