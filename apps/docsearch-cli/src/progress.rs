use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use docsearch_hybrid::IndexEvent;

/// Drives a percentage bar from indexing events until the sender is dropped.
pub fn track(mut events: UnboundedReceiver<IndexEvent>, visible: bool) -> JoinHandle<()> {
    let pb = if visible { ProgressBar::new(100) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            pb.set_position(u64::from(event.progress()));
            pb.set_message(describe(&event));
        }
        pb.finish_and_clear();
    })
}

fn describe(event: &IndexEvent) -> String {
    match event {
        IndexEvent::Chunking { .. } => "chunking".to_string(),
        IndexEvent::Lexical { chunks, .. } => format!("{chunks} chunks, building BM25 index"),
        IndexEvent::Embedding { embedded, total, .. } => format!("embedded {embedded}/{total}"),
        IndexEvent::Storing { .. } => "storing vectors".to_string(),
        IndexEvent::Done { chunks, .. } => format!("{chunks} chunks indexed"),
        IndexEvent::Error { vector_error, .. } => format!("vector indexing failed: {vector_error}"),
    }
}
