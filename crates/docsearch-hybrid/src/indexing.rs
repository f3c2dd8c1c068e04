//! Document indexing: chunk, store metadata, build the lexical index, then
//! embed and store vectors.
//!
//! Re-indexing a `doc_id` clears each store and repopulates it in turn; no
//! transaction spans the three stores. A vector failure after the lexical
//! index is built does not fail the run: lexical search keeps working and the
//! error is reported alongside the chunk count.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use docsearch_core::chunker::{chunk_document, ChunkingConfig};
use docsearch_core::trace::Stopwatch;
use docsearch_core::traits::EmbeddingOracle;
use docsearch_core::{Chunk, ChunkingMode, Document, Error, Result, SearchSettings, Stores};
use docsearch_embed::{embed_in_batches, BatchOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequest {
    pub doc_id: String,
    pub text: String,
    /// Falls back to `settings.use_chapter_chunking` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking_mode: Option<ChunkingMode>,
    #[serde(default)]
    pub settings: SearchSettings,
}

impl IndexRequest {
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { doc_id: doc_id.into(), text: text.into(), chunking_mode: None, settings: SearchSettings::default() }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ChunkingMode) -> Self {
        self.chunking_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.doc_id.trim().is_empty() || self.text.is_empty() {
            return Err(Error::InvalidInput("Missing docId/text".into()));
        }
        if self.settings.chunk_size == 0 {
            return Err(Error::InvalidInput("chunkSize must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn effective_mode(&self) -> ChunkingMode {
        self.chunking_mode.unwrap_or_else(|| self.settings.chunking_mode())
    }

    fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { mode: self.effective_mode(), ..ChunkingConfig::from(&self.settings) }
    }
}

/// Progress of one indexing run, `progress` in 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum IndexEvent {
    Chunking { progress: u8 },
    #[serde(rename_all = "camelCase")]
    Lexical { progress: u8, chunks: usize },
    #[serde(rename_all = "camelCase")]
    Embedding { progress: u8, embedded: usize, total: usize },
    Storing { progress: u8 },
    #[serde(rename_all = "camelCase")]
    Done {
        progress: u8,
        chunks: usize,
        index_time_ms: u64,
        chunking_mode: ChunkingMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sections: Option<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    Error { progress: u8, vector_error: String, chunks: usize },
}

impl IndexEvent {
    pub fn progress(&self) -> u8 {
        match self {
            Self::Chunking { progress }
            | Self::Lexical { progress, .. }
            | Self::Embedding { progress, .. }
            | Self::Storing { progress }
            | Self::Done { progress, .. }
            | Self::Error { progress, .. } => *progress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    /// True once chunks and the lexical index are in place.
    pub ok: bool,
    pub chunks: usize,
    pub index_time_ms: u64,
    pub chunking_mode: ChunkingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_error: Option<String>,
}

/// Embedding share of the progress bar sits between these two marks.
const EMBED_PROGRESS_START: u8 = 40;
const EMBED_PROGRESS_END: u8 = 90;

pub struct Indexer {
    stores: Stores,
    embedder: Arc<dyn EmbeddingOracle>,
    batch: BatchOptions,
}

impl Indexer {
    pub fn new(stores: Stores, embedder: Arc<dyn EmbeddingOracle>, batch: BatchOptions) -> Self {
        Self { stores, embedder, batch }
    }

    /// Indexes `req`, reporting progress on `events`. A closed receiver is
    /// ignored.
    ///
    /// Input problems are rejected before any store is touched; chunk store
    /// and lexical index failures fail the run.
    pub async fn index_document(&self, req: IndexRequest, events: &UnboundedSender<IndexEvent>) -> Result<IndexReport> {
        req.validate()?;
        let watch = Stopwatch::start();
        let doc_id = req.doc_id.as_str();
        let mode = req.effective_mode();
        let emit = |event: IndexEvent| {
            let _ = events.send(event);
        };

        emit(IndexEvent::Chunking { progress: 5 });
        self.stores.chunks.reset(doc_id);
        self.stores.chunks.put_document(&Document { doc_id: req.doc_id.clone(), text: req.text.clone() });
        let chunks = chunk_document(&req.text, &req.chunking());
        self.stores.chunks.put_chunks(doc_id, chunks.clone())?;
        tracing::info!(doc_id, chunks = chunks.len(), %mode, "document chunked");

        emit(IndexEvent::Lexical { progress: 20, chunks: chunks.len() });
        self.index_lexical(doc_id, &chunks).await?;

        let vector_error = self.index_vectors(doc_id, &chunks, &emit).await.err();
        let index_time_ms = u64::try_from(watch.elapsed().as_millis()).unwrap_or(u64::MAX);
        let sections = (mode == ChunkingMode::Chapter).then(|| self.stores.chunks.sections(doc_id));

        match &vector_error {
            Some(err) => {
                tracing::warn!(doc_id, error = %err, "vector indexing failed; lexical search remains available");
                emit(IndexEvent::Error { progress: 100, vector_error: err.clone(), chunks: chunks.len() });
            }
            None => {
                tracing::info!(doc_id, chunks = chunks.len(), index_time_ms, "document indexed");
                emit(IndexEvent::Done {
                    progress: 100,
                    chunks: chunks.len(),
                    index_time_ms,
                    chunking_mode: mode,
                    sections: sections.clone(),
                });
            }
        }

        Ok(IndexReport { ok: true, chunks: chunks.len(), index_time_ms, chunking_mode: mode, sections, vector_error })
    }

    async fn index_lexical(&self, doc_id: &str, chunks: &[Chunk]) -> Result<()> {
        let lexical = Arc::clone(&self.stores.lexical);
        let doc_id = doc_id.to_string();
        let chunks = chunks.to_vec();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            lexical.reset(&doc_id)?;
            lexical.index(&doc_id, &chunks)
        })
        .await
        .map_err(|e| Error::Store(e.into()))??;
        Ok(())
    }

    /// Replaces the document's vectors. The error is rendered to a message
    /// because it only ever ends up in the report.
    async fn index_vectors<F>(&self, doc_id: &str, chunks: &[Chunk], emit: &F) -> std::result::Result<(), String>
    where
        F: Fn(IndexEvent),
    {
        self.stores.vectors.reset(doc_id).await.map_err(|e| e.to_string())?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let total = texts.len();
        emit(IndexEvent::Embedding { progress: EMBED_PROGRESS_START, embedded: 0, total });
        let vectors = embed_in_batches(self.embedder.as_ref(), &texts, &self.batch, |done, total| {
            emit(IndexEvent::Embedding { progress: embed_progress(done, total), embedded: done, total });
        })
        .await
        .map_err(|e| e.to_string())?;

        emit(IndexEvent::Storing { progress: 95 });
        self.stores.vectors.insert(doc_id, chunks, &vectors).await.map_err(|e| e.to_string())?;
        tracing::debug!(doc_id, vectors = vectors.len(), embedder = self.embedder.embedder_id(), "vectors stored");
        Ok(())
    }
}

fn embed_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return EMBED_PROGRESS_END;
    }
    let span = usize::from(EMBED_PROGRESS_END - EMBED_PROGRESS_START);
    EMBED_PROGRESS_START + u8::try_from(span * done.min(total) / total).unwrap_or(0)
}
