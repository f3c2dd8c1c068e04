//! docsearch-hybrid
//!
//! Fusion pipeline over the lexical and semantic lanes: intent
//! classification, reciprocal rank fusion, LLM reranking, cited answers,
//! neighbour expansion and section summaries, plus document indexing and the
//! whole-document LLM reader. `SearchService` is the entry point.

pub mod answer;
pub mod fusion;
pub mod indexing;
pub mod intent;
pub mod neighbors;
pub mod reader;
pub mod rerank;
pub mod service;
pub mod summary;

pub use fusion::fuse;
pub use indexing::{IndexEvent, IndexReport, IndexRequest, Indexer};
pub use intent::classify_intent;
pub use rerank::rerank;
pub use service::{AgentTrace, HybridRequest, SearchMeta, SearchRequest, SearchResponse, SearchService};
pub use summary::SectionSummary;
