//! Overlapping, paragraph-aware text chunking.
//!
//! A document is cut into chunks no larger than `max_chunk_size` characters,
//! preferring paragraph boundaries and falling back to sentence boundaries
//! for paragraphs that are too big on their own. Every chunk after the first
//! starts with the trailing sentences (about `overlap_size` characters) of
//! the chunk before it, so the rewrite backend sees some context across the
//! seam.
//!
//! Sizes are measured in `char`s, never bytes, so multi-byte text is never
//! sliced mid-codepoint.
//!
//! Known limitation: when the sentence fallback kicks in, joining the
//! non-overlapping parts of the chunks is not guaranteed to reproduce the
//! input byte for byte (whitespace at the seams may differ).

use crate::config::ParaphraseConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

/// One contiguous slice of the source text.
///
/// `start_offset..end_offset` is the chunk's span in characters, measured in
/// chunk coordinates: a chunk starts `overlap` characters before the previous
/// chunk ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 0-based position; indices of one split are contiguous.
    pub index: usize,
    /// Number of chunks in the split this chunk belongs to.
    pub total_chunks: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub text: String,
}

/// Splits text into overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    max_chunk_size: usize,
    overlap_size: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(4000, 200)
    }
}

impl TextChunker {
    pub fn new(max_chunk_size: usize, overlap_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            overlap_size,
        }
    }

    pub fn from_config(config: &ParaphraseConfig) -> Self {
        Self::new(config.max_chunk_size, config.overlap_size)
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    /// Split `text` into chunks. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut acc = ChunkAccumulator::new(self.max_chunk_size, self.overlap_size);

        for paragraph in RE_PARAGRAPH_BREAK.split(text) {
            if paragraph.is_empty() {
                continue;
            }
            acc.push_paragraph(paragraph);
        }

        acc.finish()
    }
}

/// Split `text` with explicit limits. See [`TextChunker::split`].
pub fn split(text: &str, max_chunk_size: usize, overlap_size: usize) -> Vec<Chunk> {
    TextChunker::new(max_chunk_size, overlap_size).split(text)
}

// ── Accumulator ──────────────────────────────────────────────────────────

/// Greedy chunk builder.
///
/// `fresh` is false while the buffer holds nothing but the overlap seed
/// copied from the previous chunk; such a buffer is never closed on its own,
/// otherwise a chunk could consist purely of repeated text.
struct ChunkAccumulator {
    max: usize,
    overlap: usize,
    chunks: Vec<Chunk>,
    buffer: String,
    buffer_chars: usize,
    fresh: bool,
    start: usize,
}

impl ChunkAccumulator {
    fn new(max: usize, overlap: usize) -> Self {
        Self {
            max,
            overlap,
            chunks: Vec::new(),
            buffer: String::new(),
            buffer_chars: 0,
            fresh: false,
            start: 0,
        }
    }

    fn push_paragraph(&mut self, paragraph: &str) {
        let para_chars = char_len(paragraph);
        let sep = if self.buffer.is_empty() {
            0
        } else {
            PARAGRAPH_SEPARATOR.len()
        };

        if self.fresh && self.buffer_chars + sep + para_chars > self.max {
            self.close();
        }

        if para_chars > self.max {
            self.push_sentences(paragraph);
        } else {
            self.append(PARAGRAPH_SEPARATOR, paragraph, para_chars);
        }
    }

    /// Greedy fill at sentence granularity for a paragraph larger than `max`.
    fn push_sentences(&mut self, paragraph: &str) {
        let mut joiner = PARAGRAPH_SEPARATOR;

        for sentence in split_sentences(paragraph) {
            let sentence_chars = char_len(sentence);
            let joiner_chars = if self.buffer.is_empty() {
                0
            } else {
                joiner.len()
            };

            if self.fresh && self.buffer_chars + joiner_chars + sentence_chars > self.max {
                self.close();
                joiner = if self.buffer.ends_with(char::is_whitespace) {
                    ""
                } else {
                    " "
                };
            }

            self.append(joiner, sentence, sentence_chars);
            joiner = "";
        }
    }

    fn append(&mut self, joiner: &str, piece: &str, piece_chars: usize) {
        if !self.buffer.is_empty() {
            self.buffer.push_str(joiner);
            self.buffer_chars += char_len(joiner);
        }
        self.buffer.push_str(piece);
        self.buffer_chars += piece_chars;
        self.fresh = true;
    }

    /// Record the buffer as a chunk and reseed it with the overlap.
    fn close(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        let end = self.start + self.buffer_chars;
        let seed = trailing_sentences(&text, self.overlap).to_string();
        let seed_chars = char_len(&seed);

        self.chunks.push(Chunk {
            index: self.chunks.len(),
            total_chunks: 0,
            start_offset: self.start,
            end_offset: end,
            text,
        });

        self.start = end.saturating_sub(seed_chars);
        self.buffer = seed;
        self.buffer_chars = seed_chars;
        self.fresh = false;
    }

    fn finish(mut self) -> Vec<Chunk> {
        if self.fresh && !self.buffer.is_empty() {
            self.chunks.push(Chunk {
                index: self.chunks.len(),
                total_chunks: 0,
                start_offset: self.start,
                end_offset: self.start + self.buffer_chars,
                text: std::mem::take(&mut self.buffer),
            });
        }

        let total = self.chunks.len();
        for chunk in &mut self.chunks {
            chunk.total_chunks = total;
        }
        self.chunks
    }
}

// ── Text helpers ─────────────────────────────────────────────────────────

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text into sentences without losing any characters.
///
/// A sentence ends after a run of `.`, `!` or `?` that is followed by
/// whitespace or by the end of the text; the whitespace stays with the
/// sentence it follows. Text after the last terminator becomes a final
/// sentence. Concatenating the result yields the input.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, d)) = chars.peek() {
            if !is_terminator(d) {
                break;
            }
            end = j + d.len_utf8();
            chars.next();
        }

        match chars.peek() {
            None => {
                sentences.push(&text[start..end]);
                start = end;
            }
            Some(&(_, d)) if d.is_whitespace() => {
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_whitespace() {
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                sentences.push(&text[start..end]);
                start = end;
            }
            // "3.14", "e.g.x": not a boundary
            Some(_) => {}
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// The whole trailing sentences of `text` whose combined length stays
/// within `target` characters.
///
/// Falls back to the last `target` characters when even the final sentence
/// is longer than `target`.
pub(crate) fn trailing_sentences(text: &str, target: usize) -> &str {
    if target == 0 {
        return "";
    }

    let mut start = text.len();
    let mut taken = 0;
    for sentence in split_sentences(text).iter().rev() {
        let n = char_len(sentence);
        if taken + n > target {
            break;
        }
        taken += n;
        start -= sentence.len();
    }

    if taken == 0 {
        tail_chars(text, target)
    } else {
        &text[start..]
    }
}

/// The last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    let total = char_len(text);
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((i, _)) => &text[i..],
        None => "",
    }
}
