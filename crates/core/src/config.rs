use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Top-level application config, built once at process start from env vars
/// (§6 "Config (enumerated)" plus the ambient postgres/llm/server sections).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub llm: LlmConfig,
    pub reddit: RedditConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            postgres: PostgresConfig::from_env(),
            llm: LlmConfig::from_env(),
            reddit: RedditConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:   host={} port={}", self.server.host, self.server.port);
        tracing::info!("  postgres: host={} db={}", self.postgres.host, self.postgres.database);
        tracing::info!("  llm:      provider={}", self.llm.provider);
        tracing::info!(
            "  pipeline: cluster_threshold={} merge_threshold={} synth_floor={}",
            self.pipeline.cluster_threshold, self.pipeline.merge_threshold, self.pipeline.synth_member_floor
        );
    }

    /// Redacted view safe for /health and API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "server": { "host": self.server.host, "port": self.server.port },
            "postgres": { "host": self.postgres.host, "database": self.postgres.database, "configured": self.postgres.is_configured() },
            "llm": { "provider": self.llm.provider, "configured": self.llm.is_configured() },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_opt("PORT").and_then(|v| v.parse().ok()).unwrap_or(3001),
            cors_origin: env_or("CORS_ORIGIN", "*"),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("PG_HOST", "localhost"),
            port: env_opt("PG_PORT").and_then(|v| v.parse().ok()).unwrap_or(5432),
            database: env_or("PG_DATABASE", "painmine"),
            username: env_opt("PG_USERNAME"),
            password: env_opt("PG_PASSWORD"),
            max_connections: env_u32("PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!("postgres://{}:{}@{}:{}/{}", user, pass, self.host, self.port, self.database)
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── LLM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "anthropic", "openai", "ollama"
    pub provider: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("LLM_PROVIDER", "anthropic"),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-haiku-4-5"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: env_or("OLLAMA_MODEL", "llama3.2"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_dimensions: env_u32("EMBEDDING_DIMENSIONS", 1536),
            temperature: env_f32("LLM_TEMPERATURE", 0.1),
            max_tokens: env_u32("LLM_MAX_TOKENS", 1024),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "anthropic" => self.anthropic_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Reddit / HN fetch ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    pub user_agent: String,
    pub reddit_rate_ms: u64,
    pub hn_rate_ms: u64,
    pub comment_depth_max: u32,
}

impl RedditConfig {
    fn from_env() -> Self {
        Self {
            user_agent: env_or("REDDIT_USER_AGENT", "painmine/0.1 (by /u/painmine-bot)"),
            reddit_rate_ms: env_u64("REDDIT_RATE_MS", 300),
            hn_rate_ms: env_u64("HN_RATE_MS", 200),
            comment_depth_max: env_u32("COMMENT_DEPTH_MAX", 5),
        }
    }
}

// ── Pipeline constants (§6 "Config (enumerated)") ──────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub binary_filter_batch: u32,
    pub embed_batch: u32,
    pub cluster_threshold: f64,
    pub merge_threshold: f64,
    pub synth_batch: u32,
    pub synth_member_floor: u32,
    pub synth_growth: f64,
    pub cron_modulo_competitor: u64,
    pub cron_modulo_merge: u64,
    pub cron_modulo_market: u64,
}

impl PipelineConfig {
    fn from_env() -> Self {
        Self {
            binary_filter_batch: env_u32("BINARY_FILTER_BATCH", 200),
            embed_batch: env_u32("EMBED_BATCH", 20),
            cluster_threshold: env_f64("CLUSTER_THRESHOLD", 0.65),
            merge_threshold: env_f64("MERGE_THRESHOLD", 0.85),
            synth_batch: env_u32("SYNTH_BATCH", 10),
            synth_member_floor: env_u32("SYNTH_MEMBER_FLOOR", 5),
            synth_growth: env_f64("SYNTH_GROWTH", 0.10),
            cron_modulo_competitor: env_u64("CRON_MODULO_COMPETITOR", 3),
            cron_modulo_merge: env_u64("CRON_MODULO_MERGE", 6),
            cron_modulo_market: env_u64("CRON_MODULO_MARKET", 2),
        }
    }
}
