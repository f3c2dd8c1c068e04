use async_trait::async_trait;

use crate::error::OracleResult;
use crate::types::{Chunk, ChunkId};

/// A raw match from the lexical index. `bm25` is the index's similarity,
/// higher is better; the lexical lane turns it into a cost.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub chunk_id: ChunkId,
    pub text: String,
    pub section: Option<String>,
    pub bm25: f32,
}

/// A nearest-neighbour match. `distance` is the cosine distance.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk_id: ChunkId,
    pub text: String,
    pub section: Option<String>,
    pub distance: f32,
}

pub trait LexicalIndex: Send + Sync {
    /// Removes every entry of `doc_id`.
    fn reset(&self, doc_id: &str) -> anyhow::Result<()>;
    fn index(&self, doc_id: &str, chunks: &[Chunk]) -> anyhow::Result<()>;
    /// Runs `query` (index query syntax) restricted to `doc_id`. `limit: None`
    /// returns every match.
    fn search(&self, doc_id: &str, query: &str, limit: Option<usize>) -> anyhow::Result<Vec<LexicalHit>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn reset(&self, doc_id: &str) -> anyhow::Result<()>;
    async fn insert(&self, doc_id: &str, chunks: &[Chunk], vectors: &[Vec<f32>]) -> anyhow::Result<()>;
    async fn has_index(&self, doc_id: &str) -> anyhow::Result<bool>;
    /// Nearest-first by cosine distance. A document that was never indexed
    /// yields an empty list.
    async fn search(&self, doc_id: &str, vector: &[f32], limit: usize) -> anyhow::Result<Vec<VectorHit>>;
}

#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `gemini:gemini-embedding-001`).
    fn embedder_id(&self) -> &str;
    /// Embeds one request-sized batch. Callers split large inputs.
    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>>;
    async fn embed_query(&self, text: &str) -> OracleResult<Vec<f32>>;
}

#[async_trait]
pub trait GenerationOracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> OracleResult<String>;
}
