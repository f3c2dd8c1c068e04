//! LLM-only lane: the whole document goes to the generation oracle, which
//! quotes back the relevant excerpts.

use docsearch_core::traits::GenerationOracle;
use docsearch_core::{ChunkStore, Error, Result};

pub fn build_reader_prompt(query: &str, document: &str) -> String {
    format!("Find excerpts relevant to: \"{query}\".\nReturn them verbatim as a bullet list.\nDocument:\n{document}")
}

/// Raw oracle output for `query` over the stored text of `doc_id`.
pub async fn read_document(oracle: &dyn GenerationOracle, chunks: &ChunkStore, doc_id: &str, query: &str) -> Result<String> {
    let doc = chunks.document(doc_id).ok_or_else(|| Error::NotFound("document not indexed".into()))?;
    tracing::debug!(doc_id, chars = doc.text.len(), "reading whole document");
    Ok(oracle.generate(&build_reader_prompt(query, &doc.text)).await?)
}
