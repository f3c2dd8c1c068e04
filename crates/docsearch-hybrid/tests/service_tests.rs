use async_trait::async_trait;
use docsearch_core::retry::BackoffPolicy;
use docsearch_core::traits::{EmbeddingOracle, GenerationOracle};
use docsearch_core::{ChunkStore, ChunkingMode, Error, OracleError, OracleResult, Score, SearchSettings, Stores};
use docsearch_embed::{BatchOptions, HashEmbedder};
use docsearch_hybrid::summary::SectionCount;
use docsearch_hybrid::{HybridRequest, IndexEvent, IndexReport, IndexRequest, SearchRequest, SearchResponse, SearchService, SectionSummary};
use docsearch_text::TantivyLexicalIndex;
use docsearch_vector::LanceVectorStore;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

/// Answers by prompt kind: rerank, answer or whole-document read.
struct RoutedGenerator {
    rerank: OracleResult<String>,
    answer: OracleResult<String>,
    read: OracleResult<String>,
    prompts: Mutex<Vec<String>>,
}

impl RoutedGenerator {
    fn new(rerank: OracleResult<String>, answer: OracleResult<String>) -> Self {
        Self { rerank, answer, read: Err(OracleError::Model("unexpected read".into())), prompts: Mutex::new(Vec::new()) }
    }

    fn offline() -> Self {
        let err = || Err(OracleError::MissingCredentials("GEMINI_API_KEY is not set".into()));
        Self { rerank: err(), answer: err(), read: err(), prompts: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl GenerationOracle for RoutedGenerator {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if prompt.starts_with("You are a search relevance judge") {
            self.rerank.clone()
        } else if prompt.starts_with("Answer the following question") {
            self.answer.clone()
        } else {
            self.read.clone()
        }
    }
}

/// Embeds documents like the hashing embedder but cannot embed queries.
struct QueryOutage(HashEmbedder);

#[async_trait]
impl EmbeddingOracle for QueryOutage {
    fn embedder_id(&self) -> &str { "query-outage" }

    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> { self.0.embed_batch(texts).await }

    async fn embed_query(&self, _text: &str) -> OracleResult<Vec<f32>> {
        Err(OracleError::Transport("connection reset".into()))
    }
}

/// Every call fails with a server error.
struct BrokenEmbedder;

#[async_trait]
impl EmbeddingOracle for BrokenEmbedder {
    fn embedder_id(&self) -> &str { "broken" }

    async fn embed_batch(&self, _texts: &[String]) -> OracleResult<Vec<Vec<f32>>> {
        Err(OracleError::Http { status: 500, message: "boom".into() })
    }

    async fn embed_query(&self, _text: &str) -> OracleResult<Vec<f32>> {
        Err(OracleError::Http { status: 500, message: "boom".into() })
    }
}

fn paragraph(s: &str) -> String { format!("{s:<49}\n") }

fn oz_document() -> String {
    [
        paragraph("Dorothy lived in Kansas with her dog Toto."),
        paragraph("The Lion was cowardly but roared very loudly."),
        paragraph("Oz was a great and terrible wizard."),
    ]
    .concat()
}

fn small_chunks() -> SearchSettings { SearchSettings { chunk_size: 50, chunk_overlap: 0, ..SearchSettings::default() } }

async fn service(dir: &Path, embedder: Arc<dyn EmbeddingOracle>, generator: Arc<RoutedGenerator>) -> SearchService {
    let stores = Stores::new(
        Arc::new(ChunkStore::new()),
        Arc::new(TantivyLexicalIndex::in_ram().expect("tantivy")),
        Arc::new(LanceVectorStore::open(dir).await.expect("lancedb")),
    );
    SearchService::new(stores, embedder, generator).with_batch_options(fast_batches())
}

fn fast_batches() -> BatchOptions {
    BatchOptions { batch_size: 2, pause: Duration::ZERO, policy: BackoffPolicy::new(1, Duration::from_millis(1)) }
}

async fn index_text(svc: &SearchService, req: IndexRequest) -> IndexReport {
    let (tx, _rx) = unbounded_channel();
    svc.index(req, &tx).await.expect("index")
}

async fn index_oz(svc: &SearchService) -> (IndexReport, Vec<IndexEvent>) {
    let (tx, mut rx) = unbounded_channel();
    let report = svc.index(IndexRequest::new("oz", oz_document()).with_settings(small_chunks()), &tx).await.expect("index");
    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (report, events)
}

fn labels(resp: &SearchResponse) -> Vec<String> { resp.timing.steps.iter().map(|s| s.label.clone()).collect() }

fn detail(resp: &SearchResponse, label: &str) -> String {
    let trace = resp.meta.as_ref().and_then(|m| m.trace.as_ref()).expect("hybrid trace");
    trace.steps.iter().find(|s| s.label == label).and_then(|s| s.detail.clone()).unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread")]
async fn indexing_reports_progress_and_finishes_with_done() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(256)), Arc::new(RoutedGenerator::offline())).await;
    let (report, events) = index_oz(&svc).await;

    assert!(report.ok);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.chunking_mode, ChunkingMode::Fixed);
    assert!(report.sections.is_none());
    assert!(report.vector_error.is_none());

    assert!(matches!(events.first(), Some(IndexEvent::Chunking { .. })));
    assert!(matches!(events.last(), Some(IndexEvent::Done { chunks: 3, sections: None, .. })));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.windows(2).all(|w| w[0].progress() <= w[1].progress()));
    assert_eq!(events.last().map(IndexEvent::progress), Some(100));
    let embedded: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            IndexEvent::Embedding { embedded, total: 3, .. } => Some(*embedded),
            _ => None,
        })
        .collect();
    assert_eq!(embedded, vec![0, 2, 3]);

    let json = serde_json::to_value(events.last().expect("done")).expect("json");
    assert_eq!(json["stage"], "done");
    assert_eq!(json["chunkingMode"], "fixed");
    assert!(json.get("indexTimeMs").is_some());

    let resp = svc.semantic(&SearchRequest::new("oz", "cowardly lion")).await.expect("semantic");
    assert_eq!(resp.passages.len(), 3);
    assert_eq!(resp.passages[0].chunk_id, 1);
    assert_eq!(labels(&resp), vec!["Vector search"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn vector_failure_keeps_lexical_search_usable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(BrokenEmbedder), Arc::new(RoutedGenerator::offline())).await;
    let (report, events) = index_oz(&svc).await;

    assert!(report.ok);
    assert_eq!(report.chunks, 3);
    let vector_error = report.vector_error.expect("vector error reported");
    assert!(vector_error.contains("boom"), "{vector_error}");
    match events.last() {
        Some(IndexEvent::Error { vector_error, chunks, progress }) => {
            assert!(vector_error.contains("boom"));
            assert_eq!(*chunks, 3);
            assert_eq!(*progress, 100);
        }
        other => panic!("expected error event, got {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, IndexEvent::Done { .. })));

    let resp = svc.lexical(&SearchRequest::new("oz", "Dorothy")).await.expect("lexical");
    assert_eq!(resp.passages[0].chunk_id, 0);
    assert!(matches!(resp.passages[0].score, Score::Lexical(v) if v < 0.0));
    let semantic = svc.semantic(&SearchRequest::new("oz", "Dorothy")).await.expect("semantic");
    assert!(semantic.passages.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_index_requests_are_rejected_before_any_work() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(64)), Arc::new(RoutedGenerator::offline())).await;
    let (tx, mut rx) = unbounded_channel();

    let err = svc.index(IndexRequest::new("", "text"), &tx).await.expect_err("missing doc id");
    assert!(matches!(err, Error::InvalidInput(_)));
    let err = svc.index(IndexRequest::new("oz", ""), &tx).await.expect_err("missing text");
    assert!(matches!(err, Error::InvalidInput(_)));
    let zero = SearchSettings { chunk_size: 0, ..SearchSettings::default() };
    let err = svc.index(IndexRequest::new("oz", "text").with_settings(zero), &tx).await.expect_err("zero chunk size");
    assert!(matches!(err, Error::InvalidInput(_)));

    drop(tx);
    assert!(rx.recv().await.is_none());
    assert!(svc.stores().chunks.document("oz").is_none());

    let err = svc.hybrid(&HybridRequest::new("oz", "   ")).await.expect_err("empty query");
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn chapter_mode_reports_sections() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(128)), Arc::new(RoutedGenerator::offline())).await;
    let text = "Chapter I. The Cyclone\nDorothy lived in Kansas.\nChapter II. The Council\nThe Munchkins bowed.\n";
    let (tx, _rx) = unbounded_channel();
    let report = svc.index(IndexRequest::new("oz", text).with_mode(ChunkingMode::Chapter), &tx).await.expect("index");

    let sections = vec!["Chapter I. The Cyclone".to_string(), "Chapter II. The Council".to_string()];
    assert_eq!(report.chunks, 2);
    assert_eq!(report.sections.as_ref(), Some(&sections));
    assert_eq!(svc.sections("oz"), sections);

    let resp = svc.lexical(&SearchRequest::new("oz", "munchkins")).await.expect("lexical");
    let meta = resp.meta.expect("meta");
    assert_eq!(meta.phrase_mode, Some(false));
    assert_eq!(
        meta.summary,
        Some(SectionSummary::Distribution { sections: vec![SectionCount { section: sections[1].clone(), count: 1 }] })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn lexical_meta_reports_phrase_hits() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(64)), Arc::new(RoutedGenerator::offline())).await;
    index_oz(&svc).await;

    let resp = svc.lexical(&SearchRequest::new("oz", "\"lived in Kansas\"")).await.expect("lexical");
    let meta = resp.meta.expect("meta");
    assert_eq!(meta.phrase_mode, Some(true));
    assert_eq!(meta.exact_hits, Some(1));
    assert_eq!(meta.first_occurrence_chunk_id, Some(0));
    assert_eq!(labels(&resp), vec!["BM25 search"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn hybrid_runs_every_stage() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let generator = Arc::new(RoutedGenerator::new(
        Ok("[{\"index\": 1, \"score\": 9}, {\"index\": 0, \"score\": 6}]".into()),
        Ok("Dorothy lived in Kansas [Chunk 0].".into()),
    ));
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(256)), generator.clone()).await;
    index_oz(&svc).await;

    let resp = svc.hybrid(&HybridRequest::new("oz", "Dorothy Kansas")).await.expect("hybrid");
    assert_eq!(
        labels(&resp),
        vec!["Classify intent", "Parallel retrieval (BM25 + Vector)", "Merge + RRF deduplicate", "Gemini rerank", "Generate answer"]
    );
    assert_eq!(detail(&resp, "Classify intent"), "Intent: conceptual");
    assert_eq!(detail(&resp, "Parallel retrieval (BM25 + Vector)"), "BM25: 1 results, Vector: 3 results");
    assert_eq!(detail(&resp, "Merge + RRF deduplicate"), "3 unique passages");
    assert_eq!(detail(&resp, "Gemini rerank"), "Reranked 3 → top 2");

    assert_eq!(resp.passages.len(), 2);
    assert_eq!(resp.passages[0].score, Score::Reranked(0.9));
    assert_eq!(resp.passages[1].chunk_id, 0);
    assert_eq!(resp.passages[1].score, Score::Reranked(0.6));
    assert_eq!(resp.answer.as_deref(), Some("Dorothy lived in Kansas [Chunk 0]."));
    assert_eq!(resp.timing.total_ms, resp.timing.steps.iter().map(|s| s.duration_ms).sum::<u64>());

    let trace = resp.meta.as_ref().and_then(|m| m.trace.as_ref()).expect("trace");
    assert_eq!((trace.bm25_top_k, trace.vector_top_k, trace.rerank_top_n), (10, 10, 5));
    let prompts = generator.prompts.lock();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("[Chunk 0]: Dorothy lived in Kansas"));
}

#[tokio::test(flavor = "multi_thread")]
async fn hybrid_degrades_when_generation_is_unavailable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(256)), Arc::new(RoutedGenerator::offline())).await;
    index_oz(&svc).await;

    let req = HybridRequest { rerank_top_n: Some(2), ..HybridRequest::new("oz", "Dorothy") };
    let resp = svc.hybrid(&req).await.expect("hybrid still answers");
    assert_eq!(
        labels(&resp),
        vec![
            "Classify intent",
            "Parallel retrieval (BM25 + Vector)",
            "Merge + RRF deduplicate",
            "Gemini rerank (failed, using RRF order)",
            "Generate answer (failed)",
        ]
    );
    assert!(detail(&resp, "Gemini rerank (failed, using RRF order)").contains("GEMINI_API_KEY"));
    assert_eq!(resp.passages.len(), 2);
    assert_eq!(resp.passages[0].chunk_id, 0);
    assert!(resp.passages.iter().all(|p| matches!(p.score, Score::Fused(_))));
    assert!(resp.passages[0].score.value() >= resp.passages[1].score.value());
    assert!(resp.answer.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_lane_contributes_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let generator = Arc::new(RoutedGenerator::new(Ok("I cannot rank these.".into()), Ok("Toto [Chunk 0].".into())));
    let svc = service(tmp.path(), Arc::new(QueryOutage(HashEmbedder::new(64))), generator).await;
    index_oz(&svc).await;

    let resp = svc.hybrid(&HybridRequest::new("oz", "Toto")).await.expect("hybrid");
    let retrieval = detail(&resp, "Parallel retrieval (BM25 + Vector)");
    assert!(retrieval.starts_with("BM25: 1 results, Vector: 0 results"), "{retrieval}");
    assert!(retrieval.contains("Vector failed"), "{retrieval}");
    assert_eq!(resp.passages.len(), 1);
    assert_eq!(resp.passages[0].chunk_id, 0);
    assert!(matches!(resp.passages[0].score, Score::Fused(_)));
    assert_eq!(resp.answer.as_deref(), Some("Toto [Chunk 0]."));
}

#[tokio::test(flavor = "multi_thread")]
async fn hybrid_without_passages_skips_the_answer() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let generator = Arc::new(RoutedGenerator::new(Ok("[]".into()), Ok("unused".into())));
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(64)), generator.clone()).await;

    let resp = svc.hybrid(&HybridRequest::new("never-indexed", "Dorothy")).await.expect("hybrid");
    assert!(resp.passages.is_empty());
    assert!(resp.answer.is_none());
    assert!(!labels(&resp).iter().any(|l| l.starts_with("Generate answer")));
    assert!(generator.prompts.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn neighbours_are_added_before_the_answer() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let generator = Arc::new(RoutedGenerator::new(Ok("[{\"index\": 0, \"score\": 10}]".into()), Ok("Kansas [Chunk 0].".into())));
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(256)), generator).await;
    index_oz(&svc).await;

    let req = HybridRequest { rerank_top_n: Some(1), include_neighbors: Some(true), ..HybridRequest::new("oz", "Dorothy Kansas") };
    let resp = svc.hybrid(&req).await.expect("hybrid");
    let ids: Vec<u32> = resp.passages.iter().map(|p| p.chunk_id).collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(resp.passages[1].neighbor_of, Some(0));
    assert_eq!(resp.passages[1].score, Score::Reranked(1.0));

    let labels = labels(&resp);
    let expand = labels.iter().position(|l| l == "Expand neighbors").expect("expand step");
    let answer = labels.iter().position(|l| l == "Generate answer").expect("answer step");
    assert!(expand < answer);
    assert_eq!(detail(&resp, "Expand neighbors"), "+1 neighbor chunks");
}

#[tokio::test(flavor = "multi_thread")]
async fn llm_lane_reads_the_stored_document() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut generator = RoutedGenerator::offline();
    generator.read = Ok("- Dorothy lived in Kansas with her dog Toto.".into());
    let generator = Arc::new(generator);
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(64)), generator.clone()).await;

    let err = svc.llm(&SearchRequest::new("oz", "Toto")).await.expect_err("not indexed yet");
    assert!(matches!(err, Error::NotFound(ref m) if m == "document not indexed"));

    index_oz(&svc).await;
    let resp = svc.llm(&SearchRequest::new("oz", "Toto")).await.expect("llm");
    assert!(resp.passages.is_empty());
    assert_eq!(resp.meta.and_then(|m| m.output).as_deref(), Some("- Dorothy lived in Kansas with her dog Toto."));
    let prompts = generator.prompts.lock();
    assert!(prompts[0].starts_with("Find excerpts relevant to: \"Toto\".\nReturn them verbatim as a bullet list.\nDocument:\n"));
    assert!(prompts[0].ends_with(&oz_document()));
}

#[tokio::test(flavor = "multi_thread")]
async fn chapter_setting_selects_chapter_mode() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(64)), Arc::new(RoutedGenerator::offline())).await;
    let req: IndexRequest = serde_json::from_value(serde_json::json!({
        "docId": "oz",
        "text": "Chapter I. The Cyclone\nDorothy lived in Kansas.\nChapter II. The Council\nThe Munchkins bowed.\n",
        "settings": { "useChapterChunking": true },
    }))
    .expect("request");
    assert_eq!(req.chunking_mode, None);
    assert_eq!(req.effective_mode(), ChunkingMode::Chapter);

    let report = index_text(&svc, req).await;
    assert_eq!(report.chunking_mode, ChunkingMode::Chapter);
    assert_eq!(report.chunks, 2);
    assert_eq!(svc.sections("oz").len(), 2);

    let fixed = IndexRequest::new("oz", "plain text").with_settings(SearchSettings { use_chapter_chunking: true, ..SearchSettings::default() });
    assert_eq!(fixed.with_mode(ChunkingMode::Fixed).effective_mode(), ChunkingMode::Fixed);
}

#[tokio::test(flavor = "multi_thread")]
async fn reindexing_replaces_every_derived_store() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let svc = service(tmp.path(), Arc::new(HashEmbedder::new(128)), Arc::new(RoutedGenerator::offline())).await;
    let first = "Chapter I. The Cyclone\nDorothy lived in Kansas.\nChapter II. The Council\nThe Munchkins bowed.\nChapter III. The Rescue\nThe Scarecrow waved from his pole.\n";
    let report = index_text(&svc, IndexRequest::new("oz", first).with_mode(ChunkingMode::Chapter)).await;
    assert_eq!(report.chunks, 3);
    assert!(report.vector_error.is_none());

    let second = "Chapter I. The Return\nDorothy went home to Kansas.\n";
    let report = index_text(&svc, IndexRequest::new("oz", second).with_mode(ChunkingMode::Chapter)).await;
    assert_eq!(report.chunks, 1);
    assert!(report.vector_error.is_none());

    let chunks = &svc.stores().chunks;
    assert_eq!(chunks.chunk_count("oz"), 1);
    assert!(chunks.chunk("oz", 1).is_none());
    assert!(chunks.chunk("oz", 2).is_none());
    assert_eq!(svc.sections("oz"), vec!["Chapter I. The Return".to_string()]);
    assert_eq!(chunks.document("oz").map(|d| d.text), Some(second.to_string()));

    let stale = svc.lexical(&SearchRequest::new("oz", "munchkins scarecrow")).await.expect("lexical");
    assert!(stale.passages.is_empty());
    let fresh = svc.lexical(&SearchRequest::new("oz", "dorothy")).await.expect("lexical");
    assert_eq!(fresh.passages.iter().map(|p| p.chunk_id).collect::<Vec<_>>(), vec![0]);
    assert!(fresh.passages[0].text.contains("went home"));

    let semantic = svc.semantic(&SearchRequest { top_k: Some(10), ..SearchRequest::new("oz", "scarecrow pole") }).await.expect("semantic");
    assert_eq!(semantic.passages.iter().map(|p| p.chunk_id).collect::<Vec<_>>(), vec![0]);
    assert!(semantic.passages[0].text.contains("went home"));
}

#[tokio::test(flavor = "multi_thread")]
async fn reindexing_with_a_new_embedding_dimension_rebuilds_vectors() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let narrow = service(tmp.path(), Arc::new(HashEmbedder::new(8)), Arc::new(RoutedGenerator::offline())).await;
    let (report, _) = index_oz(&narrow).await;
    assert!(report.vector_error.is_none());

    let wide = SearchService::new(narrow.stores().clone(), Arc::new(HashEmbedder::new(16)), Arc::new(RoutedGenerator::offline()))
        .with_batch_options(fast_batches());
    let shorter = paragraph("Oz was a great and terrible wizard.");
    let report = index_text(&wide, IndexRequest::new("oz", shorter).with_settings(small_chunks())).await;
    assert_eq!(report.chunks, 1);
    assert_eq!(report.vector_error, None);

    let resp = wide.semantic(&SearchRequest { top_k: Some(10), ..SearchRequest::new("oz", "wizard") }).await.expect("semantic");
    assert_eq!(resp.passages.len(), 1);
    assert_eq!(resp.passages[0].chunk_id, 0);
    assert!(matches!(resp.passages[0].score, Score::Semantic(_)));
}
