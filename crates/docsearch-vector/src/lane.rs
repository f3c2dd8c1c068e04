use docsearch_core::traits::{EmbeddingOracle, VectorStore};
use docsearch_core::types::{Passage, Score};
use docsearch_core::Result;

/// Semantic lane: embeds the raw query, then ranks chunks by cosine
/// similarity (`1 - distance`), highest first. A document without vectors
/// yields an empty list.
pub async fn semantic_search(
	vectors: &dyn VectorStore,
	embedder: &dyn EmbeddingOracle,
	doc_id: &str,
	query: &str,
	top_k: usize,
) -> Result<Vec<Passage>> {
	if !vectors.has_index(doc_id).await? {
		tracing::debug!(doc_id, "no vector index, semantic lane empty");
		return Ok(Vec::new());
	}
	let q = embedder.embed_query(query).await?;
	let hits = vectors.search(doc_id, &q, top_k).await?;
	let mut passages: Vec<Passage> = hits
		.into_iter()
		.map(|h| Passage::new(h.chunk_id, h.text, h.section, Score::Semantic(1.0 - f64::from(h.distance))))
		.collect();
	passages.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
	passages.truncate(top_k);
	Ok(passages)
}
