use anyhow::Result;

use docsearch_core::traits::LexicalIndex;
use docsearch_core::types::{ChunkId, Passage, Score};

use crate::query::{bonus_literal, sanitize};

/// Added to the cost of any candidate containing the literal query.
pub const PHRASE_BONUS: f64 = -5.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalResult {
	/// Ascending by cost: most relevant first.
	pub passages: Vec<Passage>,
	pub phrase_mode: bool,
	/// Candidates whose text contains the quoted phrase; phrase mode only.
	pub exact_hits: usize,
	pub first_occurrence_chunk_id: Option<ChunkId>,
}

/// BM25 lane. Scores are costs (negated BM25 plus the literal-match bonus),
/// so lower is better and values are usually negative.
pub fn lexical_search(index: &dyn LexicalIndex, doc_id: &str, query: &str, top_k: usize) -> Result<LexicalResult> {
	let Some(sanitized) = sanitize(query) else {
		tracing::debug!(doc_id, query, "query has no searchable terms");
		return Ok(LexicalResult::default());
	};
	let candidates = index.search(doc_id, &sanitized.index_query, None)?;

	let literal = bonus_literal(query);
	let mut scored: Vec<(f64, Passage)> = candidates
		.into_iter()
		.map(|hit| {
			let mut cost = -f64::from(hit.bm25);
			if !literal.is_empty() && hit.text.to_lowercase().contains(&literal) { cost += PHRASE_BONUS; }
			(cost, Passage::new(hit.chunk_id, hit.text, hit.section, Score::Lexical(cost)))
		})
		.collect();
	scored.sort_by(|a, b| a.0.total_cmp(&b.0));

	let mut result = LexicalResult { phrase_mode: sanitized.is_phrase(), ..Default::default() };
	if let Some(phrase) = sanitized.phrase.as_deref() {
		for (_, p) in &scored {
			if p.text.to_lowercase().contains(phrase) {
				result.exact_hits += 1;
				result.first_occurrence_chunk_id.get_or_insert(p.chunk_id);
			}
		}
	}
	result.passages = scored.into_iter().take(top_k).map(|(_, p)| p).collect();
	tracing::debug!(doc_id, hits = result.passages.len(), phrase_mode = result.phrase_mode, exact_hits = result.exact_hits, "lexical search");
	Ok(result)
}
