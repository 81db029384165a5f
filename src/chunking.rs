use crate::error::{RagError, Result};

/// Default maximum chunk length, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap carried from one chunk into the next, in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Ordinal position of this chunk in the document
    pub chunk_index: usize,
    /// Name of the document this chunk belongs to
    pub source: String,
    /// Byte offset of this chunk in the original document
    pub start_position: usize,
}

/// Size limits for [`split_into_chunks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidChunking(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunking(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split text into overlapping chunks, preferring paragraph boundaries.
///
/// Whole paragraphs are packed into a chunk until the next one no longer
/// fits; the following chunk then starts with the last `chunk_overlap`
/// characters of the emitted one. A paragraph too large for a fresh chunk is
/// cut by raw length instead. Every chunk is a contiguous slice of `text` and
/// none is longer than `chunk_size` characters.
pub fn split_into_chunks(text: &str, source: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let size = config.chunk_size;
    let overlap = config.chunk_overlap;

    let mut chunks = Vec::new();
    // (start, fresh, end): the open chunk is text[start..end], and everything
    // before `fresh` was carried over from the previous chunk.
    let mut open: Option<(usize, usize, usize)> = None;

    for (para_start, para_end) in paragraph_spans(text) {
        let (mut start, mut fresh, mut end) = open.unwrap_or((para_start, para_start, para_start));

        loop {
            if char_len(text, start, para_end) <= size {
                end = para_end;
                break;
            }

            // Without overlap the next chunk starts at the paragraph, not the separator
            let seed = overlap_start(text, start, end, overlap);
            let next_start = if seed == end { para_start } else { seed };
            if end > fresh && char_len(text, next_start, para_end) <= size {
                // Close at the paragraph boundary, the paragraph fits after the seed
                push_chunk(&mut chunks, text, source, start, end);
                start = next_start;
                fresh = end.max(next_start);
                end = fresh;
                continue;
            }

            // Paragraph is too large for any chunk: fill this one to the limit
            let cut = advance(text, start, size);
            push_chunk(&mut chunks, text, source, start, cut);
            let seed = overlap_start(text, start, cut, overlap);
            start = if seed == cut {
                skip_whitespace(text, cut)
            } else {
                seed
            };
            fresh = cut.max(start);
            end = fresh;
        }

        open = Some((start, fresh, end));
    }

    if let Some((start, fresh, end)) = open {
        if end > fresh {
            push_chunk(&mut chunks, text, source, start, end);
        }
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<TextChunk>, text: &str, source: &str, start: usize, end: usize) {
    chunks.push(TextChunk {
        text: text[start..end].to_string(),
        chunk_index: chunks.len(),
        source: source.to_string(),
        start_position: start,
    });
}

/// Byte ranges of the non-blank paragraphs, trimmed of surrounding whitespace
fn paragraph_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut offset = 0;

    for piece in text.split(PARAGRAPH_SEPARATOR) {
        let piece_start = offset;
        offset += piece.len() + PARAGRAPH_SEPARATOR.len();

        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }

        let start = piece_start + (piece.len() - piece.trim_start().len());
        spans.push((start, start + trimmed.len()));
    }

    spans
}

fn char_len(text: &str, from: usize, to: usize) -> usize {
    text[from..to].chars().count()
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start().len())
}

/// Byte offset `chars` characters after `from`, clamped to the end of `text`
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte offset where the trailing `overlap` characters of `text[start..end]` begin
fn overlap_start(text: &str, start: usize, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }

    let count = char_len(text, start, end);
    if count <= overlap {
        return start;
    }

    advance(text, start, count - overlap)
}
