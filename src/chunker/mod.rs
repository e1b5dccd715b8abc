
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A bounded passage of document text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The passage text
    pub text: String,
    /// File name of the document this passage came from
    pub source: String,
    /// Position of this passage within its document
    pub chunk_index: usize,
    /// Identifier-safe primary key, derived from `(source, chunk_index)`
    pub chunk_id: String,
}

/// Strategy used to split a document into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Split on blank-line boundaries
    Paragraph,
    /// Bounded overlapping windows with separator-aware cuts
    Recursive,
}

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub strategy: ChunkStrategy,
    /// Maximum chunk size in characters for the recursive strategy
    pub max_chunk_size: usize,
    /// Characters carried over between consecutive recursive windows
    pub overlap_size: usize,
    /// Segments at or below this trimmed length are discarded
    pub min_chunk_len: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Paragraph,
            max_chunk_size: 500,
            overlap_size: 50,
            min_chunk_len: 50,
        }
    }
}

/// Split a document's raw text into chunks according to the configured strategy.
///
/// Empty or whitespace-only input produces zero chunks, as does a document
/// shorter than the minimum chunk length. That is a silent drop, not an error.
pub fn chunk_document(source: &str, text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let segments = match config.strategy {
        ChunkStrategy::Paragraph => split_paragraphs(text, config.min_chunk_len),
        ChunkStrategy::Recursive => split_recursive(text, config),
    };

    let chunks: Vec<Chunk> = segments
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            chunk_id: chunk_id(source, chunk_index),
            text,
            source: source.to_string(),
            chunk_index,
        })
        .collect();

    debug!("Chunked '{}' into {} chunks", source, chunks.len());
    chunks
}

/// Derive the identifier-safe chunk id for `(source, chunk_index)`.
///
/// The id is used as a primary key in the vector store, so it is restricted
/// to ASCII `[A-Za-z0-9._-]`: other ASCII characters map to `_` and
/// non-ASCII characters are dropped.
pub fn chunk_id(source: &str, chunk_index: usize) -> String {
    let raw = format!("{}_{}", source, chunk_index);
    raw.chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split on blank-line boundaries, discarding segments at or below the floor
fn split_paragraphs(text: &str, min_chunk_len: usize) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|segment| segment.chars().count() > min_chunk_len)
        .map(str::to_string)
        .collect()
}

/// Separators attempted in priority order before a hard character cut
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split into windows of at most `max_chunk_size` characters with
/// `overlap_size` characters of overlap between consecutive windows.
///
/// Each cut prefers the latest separator occurrence inside the window,
/// trying paragraph, line, sentence, and word boundaries before falling back
/// to a hard cut. Operates in char space so multi-byte text is never cut
/// mid-scalar.
fn split_recursive(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let max = config.max_chunk_size.max(1);
    let overlap = config.overlap_size.min(max.saturating_sub(1));

    let mut segments = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + max).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            find_cut_point(&chars, start, hard_end).unwrap_or(hard_end)
        };

        let segment: String = chars[start..end].iter().collect();
        let trimmed = segment.trim();
        if trimmed.chars().count() > config.min_chunk_len {
            segments.push(trimmed.to_string());
        }

        if end == chars.len() {
            break;
        }
        // Overlap guarantees no semantic unit is lost at a boundary.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    segments
}

/// Find the latest separator boundary inside `chars[start..hard_end]`.
///
/// Only cuts in the second half of the window are considered, so a stray
/// early separator cannot produce a degenerate tiny window.
fn find_cut_point(chars: &[char], start: usize, hard_end: usize) -> Option<usize> {
    let window: String = chars[start..hard_end].iter().collect();
    let min_cut = (hard_end - start) / 2;

    for separator in SEPARATORS {
        let cut = window
            .char_indices()
            .enumerate()
            .filter(|&(char_pos, (byte_pos, _))| {
                char_pos >= min_cut && window[byte_pos..].starts_with(separator)
            })
            .map(|(char_pos, _)| char_pos + separator.chars().count())
            .last();

        if let Some(cut) = cut {
            return Some(start + cut);
        }
    }

    None
}
