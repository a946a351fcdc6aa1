//! Subcommand handlers.

use std::sync::Arc;

use anyhow::{Context, bail};
use leadbot_rag::{IngestReport, Metadata, SearchParams};
use leadbot_server::{AppState, ServerConfig, run_server};
use serde_json::Value;
use tracing::info;

use crate::components::Components;
use crate::config::{AppConfig, Command};

pub async fn run(config: AppConfig, command: Command) -> anyhow::Result<()> {
    let components = Components::build(&config).await?;

    match command {
        Command::Serve { host, port } => serve(&config, &components, ServerConfig { host, port }).await,
        Command::Ingest { tenant, file, source, metadata, repair } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let metadata = ingest_metadata(metadata.as_deref(), source)?;
            let pipeline = components.pipeline()?;
            let report = if repair {
                pipeline.reingest_missing(&content, &tenant, &metadata).await?
            } else {
                pipeline.ingest_document_detailed(&content, &tenant, &metadata).await?
            };
            println!("{}", summarize(&report, &tenant));
            if !report.is_complete() {
                bail!("{} chunks failed; rerun with --repair", report.failed.len());
            }
            Ok(())
        }
        Command::Search { tenant, query, threshold, count, source } => {
            let mut params = SearchParams::from_config(&components.rag_config)
                .with_threshold(threshold)
                .with_count(count);
            if let Some(source) = source {
                params = params.with_filter(source_filter(source));
            }
            let hits = components.retrieval().try_search_knowledge(&query, &tenant, &params).await?;
            if hits.is_empty() {
                println!("no matches above {threshold}");
            }
            for hit in hits {
                println!("{:.3}  {}  {}", hit.similarity, hit.id, hit.content);
            }
            Ok(())
        }
        Command::Documents { tenant, limit } => {
            let documents = components.knowledge.list_documents(&tenant, limit).await?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
            Ok(())
        }
        Command::Inspect { tenant, id } => {
            let Some(chunk) = components.knowledge.get(&tenant, &id).await? else {
                bail!("no chunk {id} for tenant {tenant}");
            };
            let view = serde_json::json!({
                "id": chunk.id,
                "tenantId": chunk.tenant_id,
                "content": chunk.content,
                "metadata": chunk.metadata,
                "createdAt": chunk.created_at,
                "dimensions": chunk.embedding.len(),
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        Command::Migrate => {
            components.migrate().await?;
            println!("schema is up to date");
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, components: &Components, server: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(
        Arc::new(components.pipeline()?),
        Arc::new(components.orchestrator(config)?),
    );
    info!(host = %server.host, port = server.port, crm = components.crm.is_configured(), "starting leadbot");
    run_server(server, state).await
}

/// Metadata from `--metadata` JSON, with `--source` taking precedence.
fn ingest_metadata(raw: Option<&str>, source: Option<String>) -> anyhow::Result<Metadata> {
    let mut metadata = match raw {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("--metadata is not valid JSON")? {
            Value::Object(map) => map,
            _ => bail!("--metadata must be a JSON object"),
        },
        None => Metadata::new(),
    };
    if let Some(source) = source {
        metadata.insert("source".to_string(), Value::String(source));
    }
    Ok(metadata)
}

fn source_filter(source: String) -> Metadata {
    let mut filter = Metadata::new();
    filter.insert("source".to_string(), Value::String(source));
    filter
}

fn summarize(report: &IngestReport, tenant: &str) -> String {
    let mut summary = format!(
        "stored {} of {} chunks for tenant {tenant}",
        report.stored_count(),
        report.total_chunks
    );
    for (index, reason) in &report.failed {
        summary.push_str(&format!("\n  chunk {index} failed: {reason}"));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_overrides_metadata_json() {
        let metadata =
            ingest_metadata(Some(r#"{"source":"old","lang":"es"}"#), Some("Real to Digital KB".into())).unwrap();
        assert_eq!(metadata["source"], "Real to Digital KB");
        assert_eq!(metadata["lang"], "es");
    }

    #[test]
    fn metadata_must_be_an_object() {
        assert!(ingest_metadata(Some("[1, 2]"), None).is_err());
        assert!(ingest_metadata(Some("{not json"), None).is_err());
        assert!(ingest_metadata(None, None).unwrap().is_empty());
    }

    #[test]
    fn summary_lists_failures() {
        let report = IngestReport {
            total_chunks: 3,
            stored: vec![(0, "a".into()), (2, "c".into())],
            failed: vec![(1, "embedding timed out".into())],
        };
        assert_eq!(
            summarize(&report, "rtd"),
            "stored 2 of 3 chunks for tenant rtd\n  chunk 1 failed: embedding timed out"
        );
    }
}
