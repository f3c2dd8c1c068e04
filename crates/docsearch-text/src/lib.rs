//! docsearch-text
//!
//! Tantivy-backed lexical index and the BM25 retrieval lane: query
//! sanitization, cost-style scoring with the literal-match bonus, and
//! phrase-mode hit counting.
pub mod index;
pub mod query;
pub mod search;
pub mod tantivy_utils;

pub use index::TantivyLexicalIndex;
pub use search::{lexical_search, LexicalResult, PHRASE_BONUS};
