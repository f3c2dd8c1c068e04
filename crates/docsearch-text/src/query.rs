//! Turns free-form user queries into tantivy query strings.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex"));

const STOP_WORDS: &[&str] = &[
	"a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
	"do", "does", "did", "will", "would", "shall", "should", "may", "might",
	"can", "could", "has", "have", "had", "having", "i", "me", "my", "we", "our",
	"you", "your", "he", "him", "his", "she", "her", "it", "its", "they", "them",
	"their", "what", "which", "who", "whom", "this", "that", "these", "those",
	"am", "in", "on", "at", "to", "for", "of", "with", "by", "from", "as", "into",
	"about", "between", "through", "during", "before", "after", "above", "below",
	"and", "but", "or", "nor", "not", "no", "so", "if", "then", "than", "too",
	"very", "just", "where", "when", "how", "why",
];

pub fn is_stop_word(token: &str) -> bool { STOP_WORDS.contains(&token) }

pub fn strip_punctuation(s: &str) -> String { PUNCTUATION.replace_all(s, "").into_owned() }

/// The text between the outer double quotes when the whole query is quoted.
/// Inner quotes are kept, so `"silver" and "gold"` is one phrase. Both phrase
/// mode and the quote intent are decided here.
pub fn phrase_body(query: &str) -> Option<&str> {
	let trimmed = query.trim();
	if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
		Some(&trimmed[1..trimmed.len() - 1])
	} else {
		None
	}
}

/// Literal used for the exact-match bonus: punctuation removed, trimmed, lowercased.
pub fn bonus_literal(query: &str) -> String { strip_punctuation(query).trim().to_lowercase() }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery {
	/// Query string in index syntax, every unit double-quoted.
	pub index_query: String,
	pub phrase: Option<String>,
	pub terms: Vec<String>,
}

impl SanitizedQuery {
	pub fn is_phrase(&self) -> bool { self.phrase.is_some() }
}

/// Returns `None` when nothing searchable is left, in which case the index
/// must not be queried at all.
///
/// Plain queries keep non-stopword tokens, each quoted on its own. A query in
/// double quotes keeps every token and is quoted as one phrase.
pub fn sanitize(query: &str) -> Option<SanitizedQuery> {
	let (body, phrase_mode) = match phrase_body(query) {
		Some(inner) => (inner, true),
		None => (query, false),
	};
	let cleaned = strip_punctuation(body).to_lowercase();
	let terms: Vec<String> = cleaned
		.split_whitespace()
		.filter(|t| phrase_mode || !is_stop_word(t))
		.map(str::to_string)
		.collect();
	if terms.is_empty() { return None; }
	if phrase_mode {
		let phrase = terms.join(" ");
		Some(SanitizedQuery { index_query: format!("\"{phrase}\""), phrase: Some(phrase), terms })
	} else {
		let index_query = terms.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(" ");
		Some(SanitizedQuery { index_query, phrase: None, terms })
	}
}
