//! In-process chunk metadata store and the injected store handle.
//!
//! `Stores` is built once at startup and cloned into every component that
//! needs the chunk store, the lexical index or the vector index.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::traits::{LexicalIndex, VectorStore};
use crate::types::{Chunk, ChunkId, Document};

#[derive(Clone)]
pub struct Stores {
    pub chunks: Arc<ChunkStore>,
    pub lexical: Arc<dyn LexicalIndex>,
    pub vectors: Arc<dyn VectorStore>,
}

impl Stores {
    pub fn new(chunks: Arc<ChunkStore>, lexical: Arc<dyn LexicalIndex>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { chunks, lexical, vectors }
    }
}

#[derive(Debug, Default)]
struct DocEntry {
    text: String,
    chunks: Vec<Chunk>,
}

/// Document text plus chunk metadata keyed by `doc_id`.
#[derive(Debug, Default)]
pub struct ChunkStore {
    docs: RwLock<HashMap<String, DocEntry>>,
}

impl ChunkStore {
    pub fn new() -> Self { Self::default() }

    /// Drops the document and every chunk derived from it.
    pub fn reset(&self, doc_id: &str) {
        self.docs.write().remove(doc_id);
    }

    pub fn put_document(&self, doc: &Document) {
        self.docs.write().insert(doc.doc_id.clone(), DocEntry { text: doc.text.clone(), chunks: Vec::new() });
    }

    /// Replaces the chunk list of an existing document.
    pub fn put_chunks(&self, doc_id: &str, chunks: Vec<Chunk>) -> Result<()> {
        let mut docs = self.docs.write();
        let entry = docs.get_mut(doc_id).ok_or_else(|| Error::NotFound(format!("document '{doc_id}'")))?;
        entry.chunks = chunks;
        Ok(())
    }

    pub fn document(&self, doc_id: &str) -> Option<Document> {
        self.docs.read().get(doc_id).map(|e| Document { doc_id: doc_id.to_string(), text: e.text.clone() })
    }

    pub fn chunk_count(&self, doc_id: &str) -> usize {
        self.docs.read().get(doc_id).map_or(0, |e| e.chunks.len())
    }

    pub fn chunk(&self, doc_id: &str, chunk_id: ChunkId) -> Option<Chunk> {
        self.docs.read().get(doc_id).and_then(|e| e.chunks.iter().find(|c| c.chunk_id == chunk_id).cloned())
    }

    /// Chunks with ids in `[chunk_id - range, chunk_id + range]`, ordered by id.
    pub fn neighbors(&self, doc_id: &str, chunk_id: ChunkId, range: u32) -> Vec<Chunk> {
        let lo = chunk_id.saturating_sub(range);
        let hi = chunk_id.saturating_add(range);
        let docs = self.docs.read();
        let Some(entry) = docs.get(doc_id) else { return Vec::new() };
        let mut out: Vec<Chunk> = entry.chunks.iter().filter(|c| (lo..=hi).contains(&c.chunk_id)).cloned().collect();
        out.sort_by_key(|c| c.chunk_id);
        out
    }

    pub fn chunks_in_section(&self, doc_id: &str, section: &str) -> Vec<Chunk> {
        let docs = self.docs.read();
        let Some(entry) = docs.get(doc_id) else { return Vec::new() };
        entry.chunks.iter().filter(|c| c.section.as_deref() == Some(section)).cloned().collect()
    }

    /// Distinct section labels in order of first appearance.
    pub fn sections(&self, doc_id: &str) -> Vec<String> {
        let docs = self.docs.read();
        let Some(entry) = docs.get(doc_id) else { return Vec::new() };
        let mut seen: Vec<String> = Vec::new();
        for section in entry.chunks.iter().filter_map(|c| c.section.as_ref()) {
            if !seen.iter().any(|s| s == section) { seen.push(section.clone()); }
        }
        seen
    }
}
