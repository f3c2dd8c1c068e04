//! Per-section view of a result list.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use docsearch_core::Passage;

#[allow(clippy::expect_used)]
static CONJUNCTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(AND|OR)\b").expect("conjunction regex"));
#[allow(clippy::expect_used)]
static OPERATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(AND|OR|NOT)\b").expect("operator regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCount {
    pub section: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SectionSummary {
    /// Sections whose passages, taken together, mention every query term.
    CoOccurrence { terms: Vec<String>, sections: Vec<String> },
    /// Passage count per section, largest first.
    Distribution { sections: Vec<SectionCount> },
}

impl SectionSummary {
    /// `None` when no passage carries a section label.
    ///
    /// An `AND`/`OR` query with at least two terms reports co-occurrence if
    /// any section contains all terms; everything else gets the distribution.
    pub fn from_passages(query: &str, passages: &[Passage]) -> Option<Self> {
        let mut counts: Vec<SectionCount> = Vec::new();
        for section in passages.iter().filter_map(|p| p.section.as_deref()) {
            match counts.iter_mut().find(|c| c.section == section) {
                Some(c) => c.count += 1,
                None => counts.push(SectionCount { section: section.to_string(), count: 1 }),
            }
        }
        if counts.is_empty() {
            return None;
        }

        let terms = query_terms(query);
        if is_conjunctive(query) && terms.len() >= 2 {
            let sections: Vec<String> = counts
                .iter()
                .filter(|c| section_mentions_all(passages, &c.section, &terms))
                .map(|c| c.section.clone())
                .collect();
            if !sections.is_empty() {
                return Some(Self::CoOccurrence { terms, sections });
            }
        }

        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Some(Self::Distribution { sections: counts })
    }
}

fn is_conjunctive(query: &str) -> bool { CONJUNCTION.is_match(query) }

/// Query words with the boolean operators removed.
fn query_terms(query: &str) -> Vec<String> {
    OPERATOR.replace_all(query, "").split_whitespace().map(str::to_string).collect()
}

fn section_mentions_all(passages: &[Passage], section: &str, terms: &[String]) -> bool {
    let combined = passages
        .iter()
        .filter(|p| p.section.as_deref() == Some(section))
        .map(|p| p.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    terms.iter().all(|t| combined.contains(&t.to_lowercase()))
}
