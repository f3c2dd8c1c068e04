use docsearch_core::traits::GenerationOracle;
use docsearch_core::{OracleResult, Passage};

/// Characters of passage text given to the answer model.
pub const CONTEXT_CHARS: usize = 500;

pub const NO_PASSAGES_ANSWER: &str = "No relevant passages found.";

pub fn build_answer_prompt(query: &str, passages: &[Passage]) -> String {
    let context = passages
        .iter()
        .map(|p| {
            let label = match &p.section {
                Some(section) => format!("Chunk {}, {section}", p.chunk_id),
                None => format!("Chunk {}", p.chunk_id),
            };
            let text: String = p.text.chars().take(CONTEXT_CHARS).collect();
            format!("[{label}]: {text}")
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the following question using ONLY the provided passages. Cite your sources using [Chunk N] notation.\n\n\
         Question: \"{query}\"\n\n\
         Passages:\n{context}\n\n\
         Provide a concise, well-cited answer:"
    )
}

/// Cited answer grounded in `passages`. The oracle's text is returned as is;
/// no passages means no oracle call.
pub async fn generate_answer(oracle: &dyn GenerationOracle, query: &str, passages: &[Passage]) -> OracleResult<String> {
    if passages.is_empty() {
        return Ok(NO_PASSAGES_ANSWER.to_string());
    }
    let answer = oracle.generate(&build_answer_prompt(query, passages)).await?;
    tracing::debug!(passages = passages.len(), chars = answer.len(), "answer generated");
    Ok(answer)
}
