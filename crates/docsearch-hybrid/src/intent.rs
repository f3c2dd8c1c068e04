use regex::Regex;
use std::sync::LazyLock;

use docsearch_core::QueryIntent;
use docsearch_text::query::phrase_body;

#[allow(clippy::expect_used)]
static BOOLEAN_OPERATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(AND|OR|NOT)\b").expect("boolean operator regex"));

/// Advisory only: the lanes never branch on it.
pub fn classify_intent(query: &str) -> QueryIntent {
    if phrase_body(query).is_some() {
        QueryIntent::Quote
    } else if BOOLEAN_OPERATOR.is_match(query) {
        QueryIntent::Boolean
    } else {
        QueryIntent::Conceptual
    }
}
