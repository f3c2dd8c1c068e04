//! docsearch-vector
//!
//! LanceDB vector store (one table per document, cosine distance) and the
//! semantic retrieval lane built on it.

pub mod lane;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;
pub mod writer;

pub use lane::semantic_search;
pub use store::LanceVectorStore;
