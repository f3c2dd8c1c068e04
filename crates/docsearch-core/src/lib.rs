//! docsearch-core
//!
//! Shared domain types, typed scores, configuration, chunking, the chunk
//! metadata store and the traits behind which the lexical index, vector index
//! and embedding/generation oracles live.

#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod retry;
pub mod store;
pub mod trace;
pub mod traits;
pub mod types;

pub use error::{Error, OracleError, OracleResult, Result};
pub use store::{ChunkStore, Stores};
pub use types::{Chunk, ChunkId, ChunkingMode, Document, Passage, QueryIntent, Score, SearchSettings};
