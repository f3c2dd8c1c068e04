use anyhow::Result;
use std::sync::Arc;

use docsearch_core::config::{EmbedderKind, OracleConfig};
use docsearch_core::traits::{EmbeddingOracle, GenerationOracle};

use crate::gemini::GeminiClient;
use crate::hashing::HashEmbedder;
use crate::local::{resolve_model_dir, LocalEmbedder};

/// Builds the configured embedding oracle. The Gemini client is created even
/// without credentials; its calls then fail with `MissingCredentials`.
pub fn embedder_from_config(config: &OracleConfig) -> Result<Arc<dyn EmbeddingOracle>> {
    let embedder: Arc<dyn EmbeddingOracle> = match config.embedder {
        EmbedderKind::Gemini => Arc::new(GeminiClient::new(config)?),
        EmbedderKind::Local => Arc::new(LocalEmbedder::load(&resolve_model_dir(config.model_path())?)?),
        EmbedderKind::Hash => Arc::new(HashEmbedder::new(config.hash_dim)),
    };
    tracing::info!(embedder = embedder.embedder_id(), "embedding oracle ready");
    Ok(embedder)
}

pub fn generator_from_config(config: &OracleConfig) -> Result<Arc<dyn GenerationOracle>> {
    let client = GeminiClient::new(config)?;
    if !client.has_credentials() {
        tracing::warn!("no Gemini API key; rerank, answers and the reader lane will degrade");
    }
    Ok(Arc::new(client))
}
