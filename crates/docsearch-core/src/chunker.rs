//! Fixed-window and section-bounded chunking.
//!
//! All sizes and offsets are counted in characters, never bytes, and
//! `char_offset` always points into the original document.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Chunk, ChunkId, ChunkingMode, SearchSettings};

pub const PREAMBLE_SECTION: &str = "Preamble";

/// A whole line starting `Chapter <roman numeral>`, optionally followed by a
/// period or blank and a title. The heading never spans into the next line.
#[allow(clippy::expect_used)]
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^Chapter[ \t]+[IVXLCDM]+(?:[.\t \r][^\n]*)?$").expect("section heading regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
    pub mode: ChunkingMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 1500, overlap: 200, mode: ChunkingMode::Fixed }
    }
}

impl From<&SearchSettings> for ChunkingConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self { size: settings.chunk_size, overlap: settings.chunk_overlap, mode: settings.chunking_mode() }
    }
}

pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    match config.mode {
        ChunkingMode::Fixed => chunk_text(text, config.size, config.overlap),
        ChunkingMode::Chapter => chunk_by_section(text, config.size, config.overlap),
    }
}

/// Overlapping fixed-size windows. The step is `size - overlap`, clamped to 1
/// when the overlap swallows the whole window.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let index = CharIndex::new(text);
    let pieces = split_with_overlap(&index, 0, index.len(), size, overlap)
        .into_iter()
        .map(|(start, end)| Piece { text: index.slice(start, end).to_string(), section: None, char_offset: start });
    number(pieces)
}

/// Splits on `Chapter <roman numeral>` headings. Bodies longer than
/// `max_size` are sub-split with the fixed-window algorithm.
pub fn chunk_by_section(text: &str, max_size: usize, overlap: usize) -> Vec<Chunk> {
    let index = CharIndex::new(text);
    let mut pieces = Vec::new();
    for section in sections(text) {
        let start = index.char_at_byte(section.body_start);
        let end = index.char_at_byte(section.body_end);
        if end - start <= max_size {
            pieces.push(Piece { text: index.slice(start, end).to_string(), section: Some(section.label), char_offset: start });
            continue;
        }
        for (s, e) in split_with_overlap(&index, start, end, max_size, overlap) {
            pieces.push(Piece { text: index.slice(s, e).to_string(), section: Some(section.label.clone()), char_offset: s });
        }
    }
    number(pieces)
}

struct Piece {
    text: String,
    section: Option<String>,
    char_offset: usize,
}

fn number(pieces: impl IntoIterator<Item = Piece>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, p)| Chunk { chunk_id: i as ChunkId, text: p.text, section: p.section, char_offset: p.char_offset })
        .collect()
}

/// Window bounds `[start, end)` in characters over `[from, to)`.
fn split_with_overlap(index: &CharIndex<'_>, from: usize, to: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut cursor = from;
    while cursor < to {
        windows.push((cursor, (cursor + size).min(to).min(index.len())));
        cursor += step;
    }
    windows
}

struct SectionSpan {
    label: String,
    body_start: usize,
    body_end: usize,
}

/// Section bodies in byte offsets. Whitespace-only bodies are skipped; text
/// before the first heading is the preamble.
fn sections(text: &str) -> Vec<SectionSpan> {
    let mut spans = Vec::new();
    let mut label = PREAMBLE_SECTION.to_string();
    let mut body_start = 0usize;
    for heading in SECTION_HEADING.find_iter(text) {
        push_section(&mut spans, text, &label, body_start, heading.start());
        label = normalize_heading(heading.as_str());
        body_start = heading.end();
    }
    push_section(&mut spans, text, &label, body_start, text.len());
    spans
}

fn push_section(spans: &mut Vec<SectionSpan>, text: &str, label: &str, start: usize, end: usize) {
    if text[start..end].trim().is_empty() { return; }
    spans.push(SectionSpan { label: label.to_string(), body_start: start, body_end: end });
}

fn normalize_heading(heading: &str) -> String {
    heading.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offsets of every character boundary, so windows can be cut in
/// character units.
struct CharIndex<'a> {
    text: &'a str,
    bounds: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let bounds = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        Self { text, bounds }
    }

    fn len(&self) -> usize { self.bounds.len() - 1 }

    fn slice(&self, start: usize, end: usize) -> &'a str { &self.text[self.bounds[start]..self.bounds[end]] }

    fn char_at_byte(&self, byte: usize) -> usize {
        self.bounds.partition_point(|&b| b < byte)
    }
}
