use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray, UInt32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use docsearch_core::traits::VectorHit;

/// Cosine nearest neighbours of `vector`, nearest first.
pub async fn nearest(tbl: &Table, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
	let mut stream = tbl.vector_search(vector.to_vec())?.distance_type(DistanceType::Cosine).limit(limit).execute().await?;
	let mut hits = Vec::new();
	while let Some(batch) = stream.try_next().await? {
		hits.extend(hits_from_batch(&batch)?);
	}
	hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
	Ok(hits)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("column '{name}' missing or mistyped"))
}

pub fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<VectorHit>> {
	let ids = column::<UInt32Array>(batch, "chunk_id")?;
	let texts = column::<StringArray>(batch, "text")?;
	let sections = column::<StringArray>(batch, "section")?;
	let distances = column::<Float32Array>(batch, "_distance")?;
	Ok((0..batch.num_rows())
		.map(|i| VectorHit {
			chunk_id: ids.value(i),
			text: texts.value(i).to_string(),
			section: sections.is_valid(i).then(|| sections.value(i).to_string()),
			distance: distances.value(i),
		})
		.collect())
}
