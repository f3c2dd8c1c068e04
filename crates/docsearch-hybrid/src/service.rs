//! Request-level entry points: one per retrieval lane plus the hybrid
//! pipeline and indexing.
//!
//! Hybrid stages run in order (intent, parallel retrieval, fusion, rerank,
//! optional neighbour expansion, answer) and each records a trace step.
//! Rerank and answer degrade instead of failing the request, and a failing
//! retrieval lane contributes nothing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use docsearch_core::config::AppConfig;
use docsearch_core::trace::{Stopwatch, Timing, Trace, TraceRecorder, TraceStep};
use docsearch_core::traits::{EmbeddingOracle, GenerationOracle};
use docsearch_core::{ChunkId, Error, Passage, QueryIntent, Result, SearchSettings, Stores};
use docsearch_embed::BatchOptions;
use docsearch_text::{lexical_search, LexicalResult};
use docsearch_vector::semantic_search;

use crate::answer::generate_answer;
use crate::fusion::fuse;
use crate::indexing::{IndexEvent, IndexReport, IndexRequest, Indexer};
use crate::intent::classify_intent;
use crate::neighbors::expand_neighbors;
use crate::reader::read_document;
use crate::rerank::rerank;
use crate::summary::SectionSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub doc_id: String,
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl SearchRequest {
    pub fn new(doc_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), query: query.into(), top_k: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridRequest {
    pub doc_id: String,
    pub query: String,
    #[serde(default)]
    pub bm25_top_k: Option<usize>,
    #[serde(default)]
    pub vector_top_k: Option<usize>,
    #[serde(default)]
    pub rerank_top_n: Option<usize>,
    #[serde(default)]
    pub include_neighbors: Option<bool>,
}

impl HybridRequest {
    pub fn new(doc_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), query: query.into(), ..Default::default() }
    }
}

/// Intent and effective limits of one hybrid run, with every stage step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTrace {
    pub intent: QueryIntent,
    pub bm25_top_k: usize,
    pub vector_top_k: usize,
    pub rerank_top_n: usize,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<AgentTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SectionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_hits: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_occurrence_chunk_id: Option<ChunkId>,
    /// Raw text of the LLM reader lane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub passages: Vec<Passage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub timing: Timing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SearchMeta>,
}

pub struct SearchService {
    stores: Stores,
    embedder: Arc<dyn EmbeddingOracle>,
    generator: Arc<dyn GenerationOracle>,
    defaults: SearchSettings,
    candidate_cap: usize,
    batch: BatchOptions,
}

impl SearchService {
    pub fn new(stores: Stores, embedder: Arc<dyn EmbeddingOracle>, generator: Arc<dyn GenerationOracle>) -> Self {
        Self { stores, embedder, generator, defaults: SearchSettings::default(), candidate_cap: 20, batch: BatchOptions::default() }
    }

    /// Applies search defaults, the rerank candidate cap and embedding batch
    /// pacing from configuration.
    #[must_use]
    pub fn configure(mut self, config: &AppConfig) -> Self {
        self.defaults = config.search.clone();
        self.candidate_cap = config.rerank.candidate_cap.max(1);
        self.batch = BatchOptions::from(&config.indexing);
        self
    }

    #[must_use]
    pub fn with_batch_options(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    pub fn stores(&self) -> &Stores { &self.stores }

    pub fn defaults(&self) -> &SearchSettings { &self.defaults }

    pub async fn index(&self, req: IndexRequest, events: &UnboundedSender<IndexEvent>) -> Result<IndexReport> {
        Indexer::new(self.stores.clone(), Arc::clone(&self.embedder), self.batch).index_document(req, events).await
    }

    /// Section labels of an indexed document in reading order.
    pub fn sections(&self, doc_id: &str) -> Vec<String> { self.stores.chunks.sections(doc_id) }

    pub async fn lexical(&self, req: &SearchRequest) -> Result<SearchResponse> {
        validate(&req.doc_id, &req.query)?;
        let top_k = positive_or(req.top_k, self.defaults.bm25_top_k);
        let mut rec = TraceRecorder::new();
        let watch = Stopwatch::start();
        let result = self.lexical_lane(&req.doc_id, &req.query, top_k).await?;
        rec.record("BM25 search", watch.elapsed(), Some(format!("{} results", result.passages.len())));

        let meta = SearchMeta {
            summary: SectionSummary::from_passages(&req.query, &result.passages),
            phrase_mode: Some(result.phrase_mode),
            exact_hits: result.phrase_mode.then_some(result.exact_hits),
            first_occurrence_chunk_id: result.first_occurrence_chunk_id,
            ..Default::default()
        };
        Ok(response(result.passages, None, &rec.finish(), Some(meta)))
    }

    pub async fn semantic(&self, req: &SearchRequest) -> Result<SearchResponse> {
        validate(&req.doc_id, &req.query)?;
        let top_k = positive_or(req.top_k, self.defaults.vector_top_k);
        let mut rec = TraceRecorder::new();
        let watch = Stopwatch::start();
        let passages = self.semantic_lane(&req.doc_id, &req.query, top_k).await?;
        rec.record("Vector search", watch.elapsed(), Some(format!("{} results", passages.len())));
        Ok(response(passages, None, &rec.finish(), None))
    }

    /// Whole-document reading by the generation oracle. No passages; the
    /// oracle's text lands in `meta.output`.
    pub async fn llm(&self, req: &SearchRequest) -> Result<SearchResponse> {
        validate(&req.doc_id, &req.query)?;
        let mut rec = TraceRecorder::new();
        let watch = Stopwatch::start();
        let output = read_document(self.generator.as_ref(), &self.stores.chunks, &req.doc_id, &req.query).await?;
        rec.record("Gemini read", watch.elapsed(), Some(format!("{} chars", output.chars().count())));
        let meta = SearchMeta { output: Some(output), ..Default::default() };
        Ok(response(Vec::new(), None, &rec.finish(), Some(meta)))
    }

    pub async fn hybrid(&self, req: &HybridRequest) -> Result<SearchResponse> {
        validate(&req.doc_id, &req.query)?;
        let doc_id = req.doc_id.as_str();
        let query = req.query.as_str();
        let bm25_top_k = positive_or(req.bm25_top_k, self.defaults.bm25_top_k);
        let vector_top_k = positive_or(req.vector_top_k, self.defaults.vector_top_k);
        let rerank_top_n = positive_or(req.rerank_top_n, self.defaults.rerank_top_n);
        let include_neighbors = req.include_neighbors.unwrap_or(self.defaults.include_neighbors);
        let mut rec = TraceRecorder::new();

        let watch = Stopwatch::start();
        let intent = classify_intent(query);
        rec.record("Classify intent", watch.elapsed(), Some(format!("Intent: {intent}")));

        let watch = Stopwatch::start();
        let (lexical, semantic) =
            tokio::join!(self.lexical_lane(doc_id, query, bm25_top_k), self.semantic_lane(doc_id, query, vector_top_k));
        let mut failures = Vec::new();
        let lexical = lexical.map(|r| r.passages).unwrap_or_else(|e| {
            tracing::warn!(doc_id, error = %e, "BM25 lane failed; continuing without it");
            failures.push(format!("BM25 failed: {e}"));
            Vec::new()
        });
        let semantic = semantic.unwrap_or_else(|e| {
            tracing::warn!(doc_id, error = %e, "vector lane failed; continuing without it");
            failures.push(format!("Vector failed: {e}"));
            Vec::new()
        });
        let mut detail = format!("BM25: {} results, Vector: {} results", lexical.len(), semantic.len());
        if !failures.is_empty() {
            detail = format!("{detail} ({})", failures.join("; "));
        }
        rec.record("Parallel retrieval (BM25 + Vector)", watch.elapsed(), Some(detail));

        let watch = Stopwatch::start();
        let merged = fuse(&lexical, &semantic);
        rec.record("Merge + RRF deduplicate", watch.elapsed(), Some(format!("{} unique passages", merged.len())));

        let watch = Stopwatch::start();
        let candidates = &merged[..merged.len().min(self.candidate_cap)];
        let mut passages = match rerank(self.generator.as_ref(), query, candidates, rerank_top_n).await {
            Ok(reranked) => {
                let detail = format!("Reranked {} → top {}", candidates.len(), reranked.len());
                rec.record("Gemini rerank", watch.elapsed(), Some(detail));
                reranked
            }
            Err(e) => {
                tracing::warn!(doc_id, error = %e, "rerank failed; using RRF order");
                rec.record("Gemini rerank (failed, using RRF order)", watch.elapsed(), Some(e.to_string()));
                merged.iter().take(rerank_top_n).cloned().collect()
            }
        };

        if include_neighbors {
            let watch = Stopwatch::start();
            let before = passages.len();
            passages = expand_neighbors(&self.stores.chunks, doc_id, &passages);
            rec.record("Expand neighbors", watch.elapsed(), Some(format!("+{} neighbor chunks", passages.len() - before)));
        }

        let mut answer = None;
        if !passages.is_empty() {
            let watch = Stopwatch::start();
            match generate_answer(self.generator.as_ref(), query, &passages).await {
                Ok(text) => {
                    rec.record("Generate answer", watch.elapsed(), None);
                    answer = Some(text).filter(|t| !t.is_empty());
                }
                Err(e) => {
                    tracing::warn!(doc_id, error = %e, "answer generation failed");
                    rec.record("Generate answer (failed)", watch.elapsed(), Some(e.to_string()));
                }
            }
        }

        let trace = rec.finish();
        tracing::info!(doc_id, %intent, passages = passages.len(), total_ms = trace.total_ms(), "hybrid search finished");
        let meta = SearchMeta {
            trace: Some(AgentTrace { intent, bm25_top_k, vector_top_k, rerank_top_n, steps: trace.steps().to_vec() }),
            summary: SectionSummary::from_passages(query, &passages),
            ..Default::default()
        };
        Ok(response(passages, answer, &trace, Some(meta)))
    }

    /// Runs the blocking index search off the async executor.
    async fn lexical_lane(&self, doc_id: &str, query: &str, top_k: usize) -> Result<LexicalResult> {
        let index = Arc::clone(&self.stores.lexical);
        let (doc_id, query) = (doc_id.to_string(), query.to_string());
        let result = tokio::task::spawn_blocking(move || lexical_search(index.as_ref(), &doc_id, &query, top_k))
            .await
            .map_err(|e| Error::Store(e.into()))??;
        Ok(result)
    }

    async fn semantic_lane(&self, doc_id: &str, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        semantic_search(self.stores.vectors.as_ref(), self.embedder.as_ref(), doc_id, query, top_k).await
    }
}

fn validate(doc_id: &str, query: &str) -> Result<()> {
    if doc_id.trim().is_empty() || query.trim().is_empty() {
        return Err(Error::InvalidInput("Missing docId/query".into()));
    }
    Ok(())
}

/// Zero or absent falls back to the configured default.
fn positive_or(requested: Option<usize>, default: usize) -> usize {
    requested.filter(|k| *k > 0).unwrap_or(default)
}

fn response(passages: Vec<Passage>, answer: Option<String>, trace: &Trace, meta: Option<SearchMeta>) -> SearchResponse {
    SearchResponse { passages, answer, timing: trace.timing(), meta }
}
