//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_ORACLE__EMBEDDER=hash`). Every field
//! has a default, so an empty figment yields a usable `AppConfig`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::BackoffPolicy;
use crate::types::SearchSettings;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self::load_for_env(&env_name))
    }

    pub fn load_for_env(env_name: &str) -> Self {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment overlay for RUST_ENV"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self { figment }
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    /// The whole typed configuration, validated.
    pub fn app(&self) -> Result<AppConfig> {
        let app: AppConfig = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub oracle: OracleConfig,
    pub indexing: IndexingConfig,
    pub search: SearchSettings,
    pub rerank: RerankConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.search.chunk_size == 0 {
            return Err(Error::InvalidConfig("search.chunk_size must be positive".into()));
        }
        if self.search.chunk_overlap >= self.search.chunk_size {
            tracing::warn!(
                chunk_size = self.search.chunk_size,
                chunk_overlap = self.search.chunk_overlap,
                "overlap is not smaller than chunk size; chunk step clamps to 1"
            );
        }
        if self.indexing.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("indexing.embed_batch_size must be positive".into()));
        }
        if self.indexing.max_retries == 0 {
            return Err(Error::InvalidConfig("indexing.max_retries must be positive".into()));
        }
        if self.rerank.candidate_cap == 0 {
            return Err(Error::InvalidConfig("rerank.candidate_cap must be positive".into()));
        }
        if self.oracle.embedder == EmbedderKind::Hash && self.oracle.hash_dim == 0 {
            return Err(Error::InvalidConfig("oracle.hash_dim must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub lancedb_dir: String,
    /// On-disk tantivy index; the lexical index lives in RAM when unset.
    pub tantivy_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { lancedb_dir: "./data/lancedb".to_string(), tantivy_dir: None }
    }
}

impl StorageConfig {
    pub fn lancedb_path(&self) -> PathBuf { resolve_from_cwd(&self.lancedb_dir) }

    pub fn tantivy_path(&self) -> Option<PathBuf> { self.tantivy_dir.as_deref().map(resolve_from_cwd) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Gemini REST embeddings.
    #[default]
    Gemini,
    /// Local BGE-M3 model through candle.
    Local,
    /// Deterministic token-hash vectors, no model required.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub embedder: EmbedderKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub model_dir: Option<String>,
    pub hash_dim: usize,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::Gemini,
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            generation_model: "gemini-2.5-flash".to_string(),
            embedding_model: "gemini-embedding-001".to_string(),
            model_dir: None,
            hash_dim: 1024,
            timeout_secs: 60,
        }
    }
}

impl OracleConfig {
    /// Configured key, else `GEMINI_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }

    pub fn model_path(&self) -> Option<PathBuf> { self.model_dir.as_deref().map(resolve_from_cwd) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub embed_batch_size: usize,
    pub batch_pause_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { embed_batch_size: 20, batch_pause_ms: 500, max_retries: 3, retry_base_delay_ms: 1000 }
    }
}

impl IndexingConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
    }

    pub fn batch_pause(&self) -> Duration { Duration::from_millis(self.batch_pause_ms) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Fused candidates sent to the rerank oracle.
    pub candidate_cap: usize,
}

impl Default for RerankConfig {
    fn default() -> Self { Self { candidate_cap: 20 } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string(), format: LogFormat::Text } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

/// Expands `p` and anchors a relative result at the working directory.
pub fn resolve_from_cwd<S: AsRef<str>>(p: S) -> PathBuf {
    match env::current_dir() {
        Ok(cwd) => resolve_with_base(&cwd, p),
        Err(_) => expand_path(p),
    }
}
