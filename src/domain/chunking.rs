//! Recursive character splitting.
//!
//! Text is split on the coarsest separator present (`"\n\n"`, then `"\n"`,
//! then `" "`, then individual characters). Pieces are merged back together
//! until adding the next one would exceed `chunk_size` characters; the tail
//! of each chunk, up to `chunk_overlap` characters, is carried into the next.
//! Pieces still too large are split again with the finer separators.

use std::collections::VecDeque;
use uuid::Uuid;

use crate::domain::{ChunkMetadata, DocumentChunk};

pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: &[&str]) -> Self {
        self.separators = separators.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into trimmed, non-empty chunks in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }

        chunks
    }

    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut merged, &window);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&mut merged, &window);
        merged
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(out: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Splits on `separator`, attaching each separator to the piece after it.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(text[start..idx].to_string());
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}

/// Chunks every page of a document. Chunk indices run across pages; pages
/// are numbered from 1.
pub fn chunk_pages(
    document_id: Uuid,
    pages: &[String],
    splitter: &RecursiveSplitter,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();

    for (page_idx, page) in pages.iter().enumerate() {
        let mut search_from = 0;

        for content in splitter.split_text(page) {
            let start = page
                .get(search_from..)
                .and_then(|rest| rest.find(&content))
                .map(|i| i + search_from)
                .or_else(|| page.find(&content))
                .unwrap_or(search_from);
            let end = start + content.len();
            search_from = start + content.chars().next().map_or(1, char::len_utf8);

            let metadata = ChunkMetadata {
                page: Some(page_idx + 1),
                start_offset: start,
                end_offset: end,
                overlap: splitter.chunk_overlap(),
            };
            let index = chunks.len();
            chunks.push(DocumentChunk::new(document_id, content, index).with_metadata(metadata));
        }
    }

    chunks
}
