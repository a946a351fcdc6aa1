//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use leadbot_crm::OdooConfig;
use leadbot_telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "leadbot", about = "Multi-tenant sales assistant with a RAG knowledge base", version)]
pub struct Cli {
    #[command(flatten)]
    pub config: AppConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// OpenAI embeddings API.
    Openai,
    /// Local feature hashing. Offline development only.
    Hashing,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    pub openai_base_url: Option<String>,

    #[arg(long, env = "LEADBOT_CHAT_MODEL", default_value = "gpt-4o-mini", global = true)]
    pub chat_model: String,

    #[arg(long, env = "LEADBOT_EMBEDDING_MODEL", default_value = "text-embedding-3-small", global = true)]
    pub embedding_model: String,

    #[arg(long, env = "LEADBOT_EMBEDDING_DIMENSIONS", default_value_t = 1536, global = true)]
    pub embedding_dimensions: usize,

    #[arg(long, env = "LEADBOT_EMBEDDER", value_enum, default_value_t = EmbedderKind::Openai, global = true)]
    pub embedder: EmbedderKind,

    /// PostgreSQL with pgvector. In-memory stores are used when unset.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "ODOO_URL", global = true)]
    pub odoo_url: Option<String>,

    #[arg(long, env = "ODOO_DB", global = true)]
    pub odoo_db: Option<String>,

    #[arg(long, env = "ODOO_USERNAME", global = true)]
    pub odoo_username: Option<String>,

    #[arg(long, env = "ODOO_PASSWORD", hide_env_values = true, global = true)]
    pub odoo_password: Option<String>,

    /// Chat answers only use chunks with this `metadata.source`. All of the
    /// tenant's knowledge is used when unset.
    #[arg(long, env = "LEADBOT_KNOWLEDGE_SOURCE", global = true)]
    pub knowledge_source: Option<String>,

    #[arg(long, env = "LEADBOT_CHUNK_SIZE", default_value_t = 1000, global = true)]
    pub chunk_size: usize,

    #[arg(long, env = "LEADBOT_INGEST_CONCURRENCY", default_value_t = 4, global = true)]
    pub ingest_concurrency: usize,

    #[arg(long, env = "LEADBOT_LOG_FORMAT", default_value = "pretty", value_parser = parse_log_format, global = true)]
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Odoo settings, when all four are present.
    pub fn odoo(&self) -> Option<OdooConfig> {
        OdooConfig::from_parts(
            self.odoo_url.clone(),
            self.odoo_db.clone(),
            self.odoo_username.clone(),
            self.odoo_password.clone(),
        )
    }

    /// The knowledge source filter, if set and non-blank.
    pub fn knowledge_source(&self) -> Option<&str> {
        self.knowledge_source.as_deref().map(str::trim).filter(|source| !source.is_empty())
    }

    /// The API key, if set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "LEADBOT_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "LEADBOT_PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Ingest a text file into a tenant's knowledge base.
    Ingest {
        #[arg(long)]
        tenant: String,

        /// Plain-text document.
        file: PathBuf,

        /// Stored as `metadata.source`.
        #[arg(long)]
        source: Option<String>,

        /// Extra metadata as a JSON object.
        #[arg(long)]
        metadata: Option<String>,

        /// Only store chunks missing from an earlier, partial ingestion.
        #[arg(long)]
        repair: bool,
    },

    /// Query a tenant's knowledge base.
    Search {
        #[arg(long)]
        tenant: String,

        query: String,

        #[arg(long, default_value_t = 0.35)]
        threshold: f32,

        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Only chunks with this `metadata.source`.
        #[arg(long)]
        source: Option<String>,
    },

    /// List a tenant's most recent chunks.
    Documents {
        #[arg(long)]
        tenant: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show one stored chunk.
    Inspect {
        #[arg(long)]
        tenant: String,

        id: String,
    },

    /// Create the database schema.
    Migrate,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["leadbot", "search", "--tenant", "rtd", "precisión del escáner"]).unwrap();
        match cli.command {
            Command::Search { tenant, query, threshold, count, source } => {
                assert_eq!(tenant, "rtd");
                assert_eq!(query, "precisión del escáner");
                assert_eq!(threshold, 0.35);
                assert_eq!(count, 5);
                assert_eq!(source, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "leadbot",
            "documents",
            "--tenant",
            "rtd",
            "--embedder",
            "hashing",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config.embedder, EmbedderKind::Hashing);
        assert_eq!(cli.config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_knowledge_source_is_ignored() {
        let mut cli = Cli::try_parse_from(["leadbot", "migrate", "--knowledge-source", "Real to Digital KB"]).unwrap();
        assert_eq!(cli.config.knowledge_source(), Some("Real to Digital KB"));

        cli.config.knowledge_source = Some("  ".into());
        assert_eq!(cli.config.knowledge_source(), None);
    }

    #[test]
    fn odoo_needs_every_setting() {
        let mut cli = Cli::try_parse_from(["leadbot", "migrate"]).unwrap();
        cli.config.odoo_url = Some("https://crm.example.com/odoo".into());
        cli.config.odoo_db = Some("rtd".into());
        cli.config.odoo_username = Some("bot".into());
        assert!(cli.config.odoo().is_none());

        cli.config.odoo_password = Some("secret".into());
        assert_eq!(cli.config.odoo().unwrap().endpoint(), "https://crm.example.com/jsonrpc");
    }
}
