use std::collections::HashSet;

use docsearch_core::{ChunkStore, Passage};

/// Chunks on either side of a hit that are pulled in as context.
pub const NEIGHBOR_RANGE: u32 = 1;

/// Follows every passage with its adjacent chunks that are not already in
/// the list. Added chunks carry the anchor's score and `neighbor_of`.
pub fn expand_neighbors(chunks: &ChunkStore, doc_id: &str, passages: &[Passage]) -> Vec<Passage> {
    let mut present: HashSet<_> = passages.iter().map(|p| p.chunk_id).collect();
    let mut out = Vec::with_capacity(passages.len() * 3);
    for anchor in passages {
        out.push(anchor.clone());
        for chunk in chunks.neighbors(doc_id, anchor.chunk_id, NEIGHBOR_RANGE) {
            if present.insert(chunk.chunk_id) {
                let mut neighbor = Passage::from_chunk(&chunk, anchor.score);
                neighbor.neighbor_of = Some(anchor.chunk_id);
                out.push(neighbor);
            }
        }
    }
    out
}
