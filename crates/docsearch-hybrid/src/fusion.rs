//! Reciprocal rank fusion of the lexical and semantic lanes.

use std::collections::HashMap;

use docsearch_core::{ChunkId, Passage, Score};

/// Standard RRF damping constant.
pub const RRF_K: f64 = 60.0;

/// Contribution of a passage at 0-based `rank`.
pub fn rrf_contribution(rank: usize) -> f64 {
    1.0 / (RRF_K + rank as f64 + 1.0)
}

/// Merges both ranked lists into one, scored by summed RRF contributions.
///
/// One entry per chunk id; the payload comes from whichever lane listed the
/// chunk first (lexical before semantic). Ordering is descending by fused
/// score, ties keep first-seen order.
pub fn fuse(lexical: &[Passage], semantic: &[Passage]) -> Vec<Passage> {
    let mut slots: HashMap<ChunkId, usize> = HashMap::new();
    let mut merged: Vec<(Passage, f64)> = Vec::with_capacity(lexical.len() + semantic.len());

    for lane in [lexical, semantic] {
        for (rank, passage) in lane.iter().enumerate() {
            let contribution = rrf_contribution(rank);
            match slots.get(&passage.chunk_id) {
                Some(&slot) => merged[slot].1 += contribution,
                None => {
                    slots.insert(passage.chunk_id, merged.len());
                    merged.push((passage.clone(), contribution));
                }
            }
        }
    }

    merged.sort_by(|a, b| b.1.total_cmp(&a.1));
    merged.into_iter().map(|(p, total)| p.with_score(Score::Fused(total))).collect()
}
