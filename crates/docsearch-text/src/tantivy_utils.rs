use tantivy::schema::{Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const CHUNK_TOKENIZER: &str = "chunk_text";

/// Field handles resolved once per index.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub doc_id: Field,
	pub chunk_id: Field,
	pub text: Field,
	pub section: Field,
}

impl ChunkFields {
	pub fn from_schema(schema: &Schema) -> anyhow::Result<Self> {
		Ok(Self {
			doc_id: schema.get_field("doc_id")?,
			chunk_id: schema.get_field("chunk_id")?,
			text: schema.get_field("text")?,
			section: schema.get_field("section")?,
		})
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("doc_id", STRING | STORED);
	schema_builder.add_u64_field("chunk_id", NumericOptions::default().set_indexed().set_stored());
	// Positions are kept so quoted phrases match as phrases.
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(CHUNK_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("text", text_options);
	schema_builder.add_text_field("section", STORED);
	schema_builder.build()
}

/// Stopwords are dropped from queries, not from the index, so phrase
/// queries containing them still line up.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(64))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(CHUNK_TOKENIZER, tokenizer);
}
