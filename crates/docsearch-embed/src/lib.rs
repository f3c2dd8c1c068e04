//! docsearch-embed
//!
//! Embedding and generation oracles: the Gemini REST client, a local BGE-M3
//! model on candle, a deterministic hashing embedder, batched embedding with
//! rate-limit backoff, and provider selection from configuration.

pub mod batch;
pub mod device;
pub mod gemini;
pub mod hashing;
pub mod local;
pub mod pool;
pub mod provider;
pub mod tokenize;

pub use batch::{embed_in_batches, BatchOptions};
pub use gemini::GeminiClient;
pub use hashing::HashEmbedder;
pub use local::LocalEmbedder;
pub use provider::{embedder_from_config, generator_from_config};
