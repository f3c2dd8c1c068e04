use docsearch_core::config::{expand_path, resolve_with_base, Config, EmbedderKind, LogFormat, StorageConfig};
use figment::providers::{Format, Toml};
use figment::Figment;
use std::path::Path;

#[test]
fn empty_figment_yields_defaults() {
    let app = Config::from_figment(Figment::new()).app().expect("defaults");
    assert_eq!(app.search.chunk_size, 1500);
    assert_eq!(app.search.chunk_overlap, 200);
    assert_eq!(app.search.rerank_top_n, 5);
    assert_eq!(app.indexing.embed_batch_size, 20);
    assert_eq!(app.indexing.batch_pause_ms, 500);
    assert_eq!(app.rerank.candidate_cap, 20);
    assert_eq!(app.oracle.embedder, EmbedderKind::Gemini);
    assert_eq!(app.oracle.generation_model, "gemini-2.5-flash");
    assert_eq!(app.logging.format, LogFormat::Text);
}

#[test]
fn toml_overrides_nested_sections() {
    let toml = r#"
        [oracle]
        embedder = "hash"
        hash_dim = 64

        [search]
        chunkSize = 400
        include_neighbors = true

        [logging]
        format = "json"
    "#;
    let app = Config::from_figment(Figment::from(Toml::string(toml))).app().expect("config");
    assert_eq!(app.oracle.embedder, EmbedderKind::Hash);
    assert_eq!(app.oracle.hash_dim, 64);
    assert_eq!(app.search.chunk_size, 400);
    assert!(app.search.include_neighbors);
    assert_eq!(app.search.bm25_top_k, 10);
    assert_eq!(app.logging.format, LogFormat::Json);
}

#[test]
fn env_overrides_with_double_underscore() {
    std::env::set_var("APP_ORACLE__EMBEDDER", "local");
    std::env::set_var("APP_INDEXING__EMBED_BATCH_SIZE", "7");
    std::env::set_var("APP_SEARCH__CHUNK_SIZE", "321");
    let app = Config::load_for_env("test").app().expect("config");
    assert_eq!(app.oracle.embedder, EmbedderKind::Local);
    assert_eq!(app.indexing.embed_batch_size, 7);
    assert_eq!(app.search.chunk_size, 321);
}

#[test]
fn zero_chunk_size_is_rejected() {
    let cfg = Config::from_figment(Figment::from(Toml::string("[search]\nchunkSize = 0")));
    assert!(cfg.app().is_err());
}

#[test]
fn storage_paths_resolve_against_working_directory() {
    let cwd = std::env::current_dir().expect("cwd");
    let relative = StorageConfig { lancedb_dir: "data/lance".into(), tantivy_dir: Some("data/tantivy".into()) };
    assert_eq!(relative.lancedb_path(), cwd.join("data/lance"));
    assert_eq!(relative.tantivy_path(), Some(cwd.join("data/tantivy")));

    let absolute = StorageConfig { lancedb_dir: "/tmp/lance".into(), tantivy_dir: None };
    assert_eq!(absolute.lancedb_path(), Path::new("/tmp/lance"));
    assert_eq!(absolute.tantivy_path(), None);
}

#[test]
fn paths_expand_and_resolve() {
    std::env::set_var("DOCSEARCH_TEST_ROOT", "/data/root");
    assert_eq!(expand_path("${DOCSEARCH_TEST_ROOT}/lance"), Path::new("/data/root/lance"));
    assert_eq!(resolve_with_base(Path::new("/base"), "rel/dir"), Path::new("/base/rel/dir"));
    assert_eq!(resolve_with_base(Path::new("/base"), "/abs"), Path::new("/abs"));
}
