//! Domain types shared by the retrieval lanes and the hybrid pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk within its document, assigned in emission order.
pub type ChunkId = u32;

/// A document as submitted for indexing. One per `doc_id`; re-submitting
/// replaces every chunk and index entry derived from the previous text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub doc_id: String,
    pub text: String,
}

/// A contiguous slice of a document, the atomic unit of retrieval.
///
/// - `chunk_id`: 0-based, unique per document
/// - `section`: heading label when produced by section chunking
/// - `char_offset`: offset in characters within the original document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub char_offset: usize,
}

/// How a document is split into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMode {
    #[default]
    Fixed,
    Chapter,
}

impl fmt::Display for ChunkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Chapter => f.write_str("chapter"),
        }
    }
}

/// Which engine stage produced a score. Values of different kinds live on
/// different scales and must never be compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Lexical,
    Semantic,
    Fused,
    Reranked,
}

/// A lane-specific relevance score.
///
/// - `Lexical`: BM25 cost, lower is better, phrase bonus makes it more negative
/// - `Semantic`: cosine similarity in [-1, 1], higher is better
/// - `Fused`: reciprocal rank fusion total, higher is better
/// - `Reranked`: oracle relevance normalised to [0, 1], higher is better
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Score {
    Lexical(f64),
    Semantic(f64),
    Fused(f64),
    Reranked(f64),
}

impl Score {
    pub fn value(self) -> f64 {
        match self {
            Self::Lexical(v) | Self::Semantic(v) | Self::Fused(v) | Self::Reranked(v) => v,
        }
    }

    pub fn kind(self) -> ScoreKind {
        match self {
            Self::Lexical(_) => ScoreKind::Lexical,
            Self::Semantic(_) => ScoreKind::Semantic,
            Self::Fused(_) => ScoreKind::Fused,
            Self::Reranked(_) => ScoreKind::Reranked,
        }
    }
}

/// A retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passage {
    pub chunk_id: ChunkId,
    pub text: String,
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Set when the passage was pulled in as context around another hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_of: Option<ChunkId>,
}

impl Passage {
    pub fn new(chunk_id: ChunkId, text: impl Into<String>, section: Option<String>, score: Score) -> Self {
        Self { chunk_id, text: text.into(), score, section, neighbor_of: None }
    }

    pub fn from_chunk(chunk: &Chunk, score: Score) -> Self {
        Self::new(chunk.chunk_id, chunk.text.clone(), chunk.section.clone(), score)
    }

    #[must_use]
    pub fn with_score(mut self, score: Score) -> Self {
        self.score = score;
        self
    }
}

/// Request-scoped search and chunking knobs.
///
/// Serialized in camelCase; snake_case aliases let `APP_SEARCH__CHUNK_SIZE`
/// style environment overrides reach these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    #[serde(alias = "chunk_size")]
    pub chunk_size: usize,
    #[serde(alias = "chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(alias = "use_chapter_chunking")]
    pub use_chapter_chunking: bool,
    #[serde(alias = "bm25_top_k")]
    pub bm25_top_k: usize,
    #[serde(alias = "vector_top_k")]
    pub vector_top_k: usize,
    #[serde(alias = "rerank_top_n")]
    pub rerank_top_n: usize,
    #[serde(alias = "include_neighbors")]
    pub include_neighbors: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            use_chapter_chunking: false,
            bm25_top_k: 10,
            vector_top_k: 10,
            rerank_top_n: 5,
            include_neighbors: false,
        }
    }
}

impl SearchSettings {
    pub fn chunking_mode(&self) -> ChunkingMode {
        if self.use_chapter_chunking { ChunkingMode::Chapter } else { ChunkingMode::Fixed }
    }
}

/// Advisory classification of a query, recorded in the hybrid trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Quote,
    Boolean,
    Conceptual,
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quote => f.write_str("quote"),
            Self::Boolean => f.write_str("boolean"),
            Self::Conceptual => f.write_str("conceptual"),
        }
    }
}
