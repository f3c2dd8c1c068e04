use anyhow::Result;
use parking_lot::Mutex;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use docsearch_core::traits::{LexicalHit, LexicalIndex};
use docsearch_core::types::Chunk;

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Tantivy-backed lexical index holding the chunks of every indexed document,
/// filtered per request by `doc_id`.
pub struct TantivyLexicalIndex {
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	fields: ChunkFields,
}

impl TantivyLexicalIndex {
	pub fn in_ram() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	/// Recreates an on-disk index at `index_dir`, discarding previous contents.
	pub fn create_in_dir(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		Self::from_index(Index::create_in_dir(index_dir, build_schema())?)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&index.schema())?;
		let writer = index.writer(WRITER_HEAP_BYTES)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, writer: Mutex::new(writer), fields })
	}

	fn doc_filter(&self, doc_id: &str) -> Box<dyn Query> {
		Box::new(TermQuery::new(Term::from_field_text(self.fields.doc_id, doc_id), IndexRecordOption::Basic))
	}

	fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}
}

impl LexicalIndex for TantivyLexicalIndex {
	fn reset(&self, doc_id: &str) -> Result<()> {
		let mut writer = self.writer.lock();
		writer.delete_term(Term::from_field_text(self.fields.doc_id, doc_id));
		self.commit(&mut writer)
	}

	fn index(&self, doc_id: &str, chunks: &[Chunk]) -> Result<()> {
		let mut writer = self.writer.lock();
		for c in chunks {
			let mut document = doc!(
				self.fields.doc_id => doc_id.to_string(),
				self.fields.chunk_id => u64::from(c.chunk_id),
				self.fields.text => c.text.clone(),
			);
			if let Some(section) = &c.section { document.add_text(self.fields.section, section); }
			writer.add_document(document)?;
		}
		self.commit(&mut writer)?;
		tracing::debug!(doc_id, chunks = chunks.len(), "lexical index committed");
		Ok(())
	}

	fn search(&self, doc_id: &str, query: &str, limit: Option<usize>) -> Result<Vec<LexicalHit>> {
		let searcher = self.reader.searcher();
		let mut qp = QueryParser::for_index(&self.index, vec![self.fields.text]);
		qp.set_conjunction_by_default();
		let text_query = qp.parse_query(query)?;
		let q = BooleanQuery::new(vec![(Occur::Must, self.doc_filter(doc_id)), (Occur::Must, text_query)]);
		let limit = limit.unwrap_or_else(|| searcher.num_docs() as usize).max(1);
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let d: TantivyDocument = searcher.doc(addr)?;
			let Some(chunk_id) = d.get_first(self.fields.chunk_id).and_then(|v| v.as_u64()) else { continue };
			let text = d.get_first(self.fields.text).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let section = d.get_first(self.fields.section).and_then(|v| v.as_str()).map(str::to_string);
			hits.push(LexicalHit { chunk_id: u32::try_from(chunk_id)?, text, section, bm25: score });
		}
		Ok(hits)
	}
}
