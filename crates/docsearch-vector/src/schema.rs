use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// One table per document, rows are chunks.
///
/// ASCII letters, digits and `-` are kept; every other byte, `_` included,
/// becomes `_xx` (lowercase hex), so distinct doc ids never share a table.
pub fn table_name(doc_id: &str) -> String {
	let mut name = String::from("chunks_");
	for b in doc_id.bytes() {
		if b.is_ascii_alphanumeric() || b == b'-' {
			name.push(char::from(b));
		} else {
			name.push_str(&format!("_{b:02x}"));
		}
	}
	name
}

pub fn vector_type(dim: i32) -> DataType {
	DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim)
}

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("chunk_id", DataType::UInt32, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("section", DataType::Utf8, true),
		Field::new("char_offset", DataType::UInt64, false),
		Field::new("vector", vector_type(dim), true),
	]))
}
