use async_trait::async_trait;
use std::hash::Hasher;
use twox_hash::XxHash64;

use docsearch_core::traits::EmbeddingOracle;
use docsearch_core::OracleResult;

/// Deterministic bag-of-tokens embedder. Each lowercased alphanumeric token
/// is hashed into one of `dim` buckets and the vector is L2-normalised, so
/// texts sharing words end up close under cosine distance. Needs no model
/// files or network, which makes it the embedder of choice for tests.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:{dim}") }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * (1.0 + ((h >> 32) as u32 as f32) / (u32::MAX as f32));
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        } else {
            // Token-free text still needs a unit vector for cosine distance.
            v[0] = 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingOracle for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> OracleResult<Vec<f32>> { Ok(self.embed(text)) }
}
