//! `docsearch`: index one text file and query it through any retrieval lane.
//!
//! The chunk store lives in memory, so every command indexes the file first
//! and then runs in the same process.

mod logging;
mod progress;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

use docsearch_core::config::{AppConfig, Config};
use docsearch_core::traits::LexicalIndex;
use docsearch_core::{ChunkStore, ChunkingMode, Passage, SearchSettings, Stores};
use docsearch_embed::{embedder_from_config, generator_from_config};
use docsearch_hybrid::{HybridRequest, IndexReport, IndexRequest, SearchRequest, SearchResponse, SearchService};
use docsearch_text::TantivyLexicalIndex;
use docsearch_vector::LanceVectorStore;

#[derive(Parser)]
#[command(name = "docsearch")]
#[command(about = "Hybrid BM25 + vector search with LLM rerank over a single document")]
#[command(version)]
struct Cli {
    /// Configuration environment (config.<env>.toml); defaults to RUST_ENV
    #[arg(long)]
    env: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and index a document, then print the index report
    Index {
        #[command(flatten)]
        doc: DocArgs,
    },

    /// Index a document and run one query through a lane
    Search {
        /// Retrieval lane
        #[arg(value_enum)]
        lane: Lane,

        /// Query text; wrap in double quotes for phrase mode
        query: String,

        #[command(flatten)]
        doc: DocArgs,

        /// Result count for the lexical and semantic lanes
        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        bm25_top_k: Option<usize>,

        #[arg(long)]
        vector_top_k: Option<usize>,

        #[arg(long)]
        rerank_top_n: Option<usize>,

        /// Add adjacent chunks around each hybrid hit
        #[arg(long)]
        neighbors: bool,
    },

    /// List the chapter sections of a document
    Sections {
        #[command(flatten)]
        doc: DocArgs,
    },
}

#[derive(Args)]
struct DocArgs {
    /// Plain text document
    file: PathBuf,

    /// Document id; defaults to the file stem
    #[arg(long)]
    doc_id: Option<String>,

    #[arg(long, value_enum, default_value_t = Mode::Fixed)]
    mode: Mode,

    /// Chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Chunk overlap in characters
    #[arg(long)]
    overlap: Option<usize>,
}

impl DocArgs {
    fn doc_id(&self) -> String {
        self.doc_id.clone().unwrap_or_else(|| {
            self.file.file_stem().map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned())
        })
    }

    fn settings(&self, defaults: &SearchSettings) -> SearchSettings {
        SearchSettings {
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            chunk_overlap: self.overlap.unwrap_or(defaults.chunk_overlap),
            use_chapter_chunking: self.mode == Mode::Chapter,
            ..defaults.clone()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Fixed,
    Chapter,
}

impl From<Mode> for ChunkingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fixed => ChunkingMode::Fixed,
            Mode::Chapter => ChunkingMode::Chapter,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Lane {
    #[value(alias = "bm25")]
    Lexical,
    #[value(alias = "vector")]
    Semantic,
    Hybrid,
    #[value(alias = "gemini")]
    Llm,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.env {
        Some(name) => Config::load_for_env(name),
        None => Config::load()?,
    };
    let app = config.app()?;
    logging::init(&app.logging, cli.verbose)?;
    let service = build_service(&app).await?;

    match cli.command {
        Commands::Index { doc } => {
            let report = index_file(&service, &doc, cli.json).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Search { lane, query, doc, top_k, bm25_top_k, vector_top_k, rerank_top_n, neighbors } => {
            index_file(&service, &doc, cli.json).await?;
            let doc_id = doc.doc_id();
            let response = match lane {
                Lane::Lexical => service.lexical(&SearchRequest { top_k, ..SearchRequest::new(&doc_id, &query) }).await?,
                Lane::Semantic => service.semantic(&SearchRequest { top_k, ..SearchRequest::new(&doc_id, &query) }).await?,
                Lane::Llm => service.llm(&SearchRequest::new(&doc_id, &query)).await?,
                Lane::Hybrid => {
                    let req = HybridRequest {
                        bm25_top_k,
                        vector_top_k,
                        rerank_top_n,
                        include_neighbors: neighbors.then_some(true),
                        ..HybridRequest::new(&doc_id, &query)
                    };
                    service.hybrid(&req).await?
                }
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Commands::Sections { mut doc } => {
            doc.mode = Mode::Chapter;
            index_file(&service, &doc, cli.json).await?;
            let sections = service.sections(&doc.doc_id());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sections)?);
            } else {
                for (i, section) in sections.iter().enumerate() {
                    println!("{:>3}. {section}", i + 1);
                }
            }
        }
    }
    Ok(())
}

async fn build_service(config: &AppConfig) -> Result<SearchService> {
    let lexical: Arc<dyn LexicalIndex> = match config.storage.tantivy_path() {
        Some(dir) => Arc::new(TantivyLexicalIndex::create_in_dir(&dir)?),
        None => Arc::new(TantivyLexicalIndex::in_ram()?),
    };
    let vectors = Arc::new(LanceVectorStore::open(&config.storage.lancedb_path()).await?);
    let stores = Stores::new(Arc::new(ChunkStore::new()), lexical, vectors);
    let embedder = embedder_from_config(&config.oracle)?;
    let generator = generator_from_config(&config.oracle)?;
    Ok(SearchService::new(stores, embedder, generator).configure(config))
}

async fn index_file(service: &SearchService, doc: &DocArgs, quiet: bool) -> Result<IndexReport> {
    let text = tokio::fs::read_to_string(&doc.file).await.with_context(|| format!("reading {}", doc.file.display()))?;
    let req = IndexRequest::new(doc.doc_id(), text)
        .with_mode(doc.mode.into())
        .with_settings(doc.settings(service.defaults()));

    let (tx, rx) = unbounded_channel();
    let bar = progress::track(rx, !quiet);
    let report = service.index(req, &tx).await;
    drop(tx);
    bar.await?;
    let report = report?;
    if let Some(err) = &report.vector_error {
        tracing::warn!(error = %err, "semantic and hybrid vector lanes will be empty");
    }
    Ok(report)
}

fn print_report(report: &IndexReport) {
    println!("✅ Indexed {} chunks ({} mode) in {} ms", report.chunks, report.chunking_mode, report.index_time_ms);
    if let Some(sections) = &report.sections {
        println!("📚 {} sections", sections.len());
    }
    if let Some(err) = &report.vector_error {
        println!("⚠️  Vector indexing failed, lexical search only: {err}");
    }
}

fn print_response(resp: &SearchResponse) {
    if let Some(output) = resp.meta.as_ref().and_then(|m| m.output.as_deref()) {
        println!("{output}");
    }
    if resp.passages.is_empty() && resp.meta.as_ref().is_none_or(|m| m.output.is_none()) {
        println!("No results found.");
    }
    for (rank, p) in resp.passages.iter().enumerate() {
        print_passage(rank, p);
    }
    if let Some(summary) = resp.meta.as_ref().and_then(|m| m.summary.as_ref()) {
        if let Ok(line) = serde_json::to_string(summary) {
            println!("\n📚 {line}");
        }
    }
    if let Some(answer) = &resp.answer {
        println!("\n💬 {answer}");
    }
    let steps: Vec<String> = resp.timing.steps.iter().map(|s| format!("{} {}ms", s.label, s.duration_ms)).collect();
    println!("\n⏱️  {} ms total ({})", resp.timing.total_ms, steps.join(", "));
}

fn print_passage(rank: usize, p: &Passage) {
    let section = p.section.as_deref().map(|s| format!(", {s}")).unwrap_or_default();
    let neighbor = p.neighbor_of.map(|a| format!(" (context for {a})")).unwrap_or_default();
    let preview: String = p.text.chars().take(200).collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ");
    println!("{:>2}. [chunk {}{section}] {:?} {:.4}{neighbor}", rank + 1, p.chunk_id, p.score.kind(), p.score.value());
    println!("    {preview}");
}
