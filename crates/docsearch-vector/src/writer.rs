use anyhow::{ensure, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array, UInt64Array};
use lancedb::Connection;
use std::sync::Arc;

use docsearch_core::types::Chunk;

use crate::schema::build_chunk_schema;
use crate::table::open_if_exists;

pub fn chunks_to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
	ensure!(chunks.len() == vectors.len(), "chunks and vectors length must match ({} vs {})", chunks.len(), vectors.len());
	let dim = vectors.first().map_or(0, Vec::len);
	ensure!(dim > 0, "cannot store empty vectors");
	ensure!(vectors.iter().all(|v| v.len() == dim), "vectors must share one dimension");
	let dim = i32::try_from(dim)?;

	let ids = UInt32Array::from_iter_values(chunks.iter().map(|c| c.chunk_id));
	let texts = StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()));
	let sections = StringArray::from(chunks.iter().map(|c| c.section.as_deref()).collect::<Vec<_>>());
	let offsets = UInt64Array::from_iter_values(chunks.iter().map(|c| c.char_offset as u64));
	let vecs = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.iter().map(|v| Some(v.iter().copied().map(Some))), dim);

	Ok(RecordBatch::try_new(
		build_chunk_schema(dim),
		vec![Arc::new(ids), Arc::new(texts), Arc::new(sections), Arc::new(offsets), Arc::new(vecs)],
	)?)
}

/// Appends to `name`, creating the table on first write.
pub async fn insert_batch(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
	let schema = batch.schema();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
	match open_if_exists(conn, name).await? {
		Some(tbl) => {
			tbl.add(reader).execute().await?;
		}
		None => {
			conn.create_table(name, reader).execute().await?;
		}
	}
	Ok(())
}
