//! BGE-M3 sentence embeddings computed in-process with candle.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;

use docsearch_core::traits::EmbeddingOracle;
use docsearch_core::{OracleError, OracleResult};

use crate::device::select_device;
use crate::pool::{masked_mean_l2, to_rows};
use crate::tokenize::tokenize_batch;

const MAX_TOKENS: usize = 256;

struct LocalModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalModel {
    fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)?.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(model_dir = %model_dir.display(), "BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device })
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, MAX_TOKENS, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        to_rows(&masked_mean_l2(&hidden, &attention_mask)?)
    }
}

/// Local embedding oracle. Inference runs on the blocking pool so the async
/// runtime is never stalled by a forward pass.
pub struct LocalEmbedder {
    inner: Arc<LocalModel>,
    id: String,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        Ok(Self { inner: Arc::new(LocalModel::load(model_dir)?), id: "local:bge-m3".to_string() })
    }

    async fn run(&self, texts: Vec<String>) -> OracleResult<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.embed(&texts))
            .await
            .map_err(|e| OracleError::Model(e.to_string()))?
            .map_err(|e| OracleError::Model(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingOracle for LocalEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> { self.run(texts.to_vec()).await }

    async fn embed_query(&self, text: &str) -> OracleResult<Vec<f32>> {
        self.run(vec![text.to_string()]).await?.pop().ok_or_else(|| OracleError::Model("empty embedding output".into()))
    }
}

/// First existing directory among the configured one, `$MODEL_DIR` and the
/// conventional `models/bge-m3` locations.
pub fn resolve_model_dir(configured: Option<PathBuf>) -> Result<PathBuf> {
    let candidates = configured
        .into_iter()
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3"), PathBuf::from("../models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            tracing::debug!(model_dir = %dir.display(), "using model dir");
            return Ok(dir);
        }
    }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
