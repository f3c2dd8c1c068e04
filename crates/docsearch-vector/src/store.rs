use anyhow::Result;
use async_trait::async_trait;
use lancedb::Connection;
use std::path::Path;

use docsearch_core::traits::{VectorHit, VectorStore};
use docsearch_core::types::Chunk;

use crate::schema::table_name;
use crate::search::nearest;
use crate::table::{open_db, open_if_exists, table_exists};
use crate::writer::{chunks_to_record_batch, insert_batch};

/// Rows written per LanceDB append.
const INSERT_BATCH_ROWS: usize = 1000;

/// LanceDB-backed vector store with one `chunks_<doc_id>` table per document.
pub struct LanceVectorStore {
	db: Connection,
}

impl LanceVectorStore {
	pub async fn open(dir: &Path) -> Result<Self> {
		let db = open_db(dir).await?;
		tracing::info!(dir = %dir.display(), "vector store opened");
		Ok(Self { db })
	}
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	/// Drops the document's table, so the next insert recreates it with the
	/// current embedding dimension.
	async fn reset(&self, doc_id: &str) -> Result<()> {
		let name = table_name(doc_id);
		if table_exists(&self.db, &name).await? {
			self.db.drop_table(&name, &[]).await?;
			tracing::debug!(table = %name, "vector table dropped");
		}
		Ok(())
	}

	async fn insert(&self, doc_id: &str, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
		if chunks.is_empty() { return Ok(()); }
		let name = table_name(doc_id);
		for (c, v) in chunks.chunks(INSERT_BATCH_ROWS).zip(vectors.chunks(INSERT_BATCH_ROWS)) {
			insert_batch(&self.db, &name, chunks_to_record_batch(c, v)?).await?;
		}
		tracing::debug!(table = %name, rows = chunks.len(), "vectors stored");
		Ok(())
	}

	async fn has_index(&self, doc_id: &str) -> Result<bool> {
		match open_if_exists(&self.db, &table_name(doc_id)).await? {
			Some(tbl) => Ok(tbl.count_rows(None).await? > 0),
			None => Ok(false),
		}
	}

	async fn search(&self, doc_id: &str, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
		let Some(tbl) = open_if_exists(&self.db, &table_name(doc_id)).await? else { return Ok(Vec::new()) };
		if limit == 0 || tbl.count_rows(None).await? == 0 { return Ok(Vec::new()); }
		nearest(&tbl, vector, limit).await
	}
}
