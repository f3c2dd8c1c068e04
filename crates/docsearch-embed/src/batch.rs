use std::time::Duration;

use docsearch_core::config::IndexingConfig;
use docsearch_core::retry::{retry_with_backoff, BackoffPolicy};
use docsearch_core::traits::EmbeddingOracle;
use docsearch_core::{OracleError, OracleResult};

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Sleep between consecutive batches, not after the last one.
    pub pause: Duration,
    pub policy: BackoffPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self { Self::from(&IndexingConfig::default()) }
}

impl From<&IndexingConfig> for BatchOptions {
    fn from(cfg: &IndexingConfig) -> Self {
        Self { batch_size: cfg.embed_batch_size.max(1), pause: cfg.batch_pause(), policy: cfg.backoff_policy() }
    }
}

/// Embeds `texts` in order, one oracle request per batch, retrying rate
/// limited batches per `opts.policy`. `on_batch(done, total)` fires after
/// each batch. The first batch that exhausts its retries fails the call.
pub async fn embed_in_batches<F>(oracle: &dyn EmbeddingOracle, texts: &[String], opts: &BatchOptions, mut on_batch: F) -> OracleResult<Vec<Vec<f32>>>
where
    F: FnMut(usize, usize),
{
    let total = texts.len();
    let mut vectors = Vec::with_capacity(total);
    let batch_size = opts.batch_size.max(1);
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        if i > 0 && !opts.pause.is_zero() { tokio::time::sleep(opts.pause).await; }
        let embedded = retry_with_backoff(&opts.policy, || oracle.embed_batch(batch)).await?;
        if embedded.len() != batch.len() {
            return Err(OracleError::Malformed(format!("batch {i}: expected {} vectors, got {}", batch.len(), embedded.len())));
        }
        vectors.extend(embedded);
        tracing::debug!(batch = i, done = vectors.len(), total, embedder = oracle.embedder_id(), "embedded batch");
        on_batch(vectors.len(), total);
    }
    Ok(vectors)
}
