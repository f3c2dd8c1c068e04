//! LLM relevance reranking.
//!
//! The oracle sees every candidate once, in a single prompt, and answers with
//! a JSON array of `{index, score}` pairs on a 0-10 scale. Anything it says
//! around the array is ignored; a reply with no usable array keeps the
//! incoming order.

use std::collections::HashSet;

use serde_json::Value;

use docsearch_core::traits::GenerationOracle;
use docsearch_core::{OracleResult, Passage, Score};

/// Characters of passage text shown to the judge.
pub const PREVIEW_CHARS: usize = 300;

pub fn build_rerank_prompt(query: &str, passages: &[Passage]) -> String {
    let list = passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{i}] (chunkId={}) {}", p.chunk_id, preview(&p.text, PREVIEW_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are a search relevance judge. Score each passage for relevance to the query.\n\n\
         Query: \"{query}\"\n\n\
         Passages:\n{list}\n\n\
         Return a JSON array of objects with \"index\" (passage index) and \"score\" (0-10, where 10 is most relevant).\n\
         Return ONLY the JSON array, no other text.\n\
         Example: [{{\"index\": 0, \"score\": 8}}, {{\"index\": 1, \"score\": 3}}]"
    )
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Slice of `raw` holding the first top-level `[...]`, matched bracket by
/// bracket. Brackets inside JSON string literals do not count.
pub fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// A validated `(index, score)` pair from the judge's reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgement {
    pub index: usize,
    pub score: f64,
}

/// Parses the judge's reply. `None` means the reply had no parseable array.
///
/// Entries with an index outside `[0, len)` or without a numeric score are
/// dropped; a repeated index keeps its first entry. The result is sorted by
/// score, highest first, ties in reply order.
pub fn parse_judgements(raw: &str, len: usize) -> Option<Vec<Judgement>> {
    let items: Vec<Value> = serde_json::from_str(extract_json_array(raw)?).ok()?;
    let mut seen = HashSet::new();
    let mut judged: Vec<Judgement> = items
        .iter()
        .filter_map(|item| {
            let index = item.get("index").and_then(as_index)?;
            let score = item.get("score").and_then(Value::as_f64)?;
            (index < len).then_some(Judgement { index, score })
        })
        .filter(|j| seen.insert(j.index))
        .collect();
    judged.sort_by(|a, b| b.score.total_cmp(&a.score));
    Some(judged)
}

fn as_index(v: &Value) -> Option<usize> {
    if let Some(i) = v.as_u64() {
        return usize::try_from(i).ok();
    }
    // judges sometimes answer `1.0`
    v.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as usize)
}

/// Reranks `passages` (already capped by the caller) and keeps the best
/// `top_n`, scored `judge score / 10`.
///
/// Returns the first `top_n` inputs unchanged when the reply is unusable. A
/// failed oracle call is returned to the caller.
pub async fn rerank(oracle: &dyn GenerationOracle, query: &str, passages: &[Passage], top_n: usize) -> OracleResult<Vec<Passage>> {
    if passages.is_empty() {
        return Ok(Vec::new());
    }
    let raw = oracle.generate(&build_rerank_prompt(query, passages)).await?;
    let Some(judged) = parse_judgements(&raw, passages.len()) else {
        tracing::warn!(candidates = passages.len(), "rerank reply had no usable JSON array; keeping input order");
        return Ok(passages.iter().take(top_n).cloned().collect());
    };
    tracing::debug!(candidates = passages.len(), judged = judged.len(), top_n, "rerank scored");
    Ok(judged
        .into_iter()
        .take(top_n)
        .map(|j| passages[j.index].clone().with_score(Score::Reranked(j.score / 10.0)))
        .collect())
}
