//! Stitch rewritten chunks back into one document.
//!
//! Chunks were cut with overlapping text, and the backend may or may not
//! repeat that overlap in its output. For each seam we look for the last one
//! to three sentences of the previous rewritten chunk at the start of the
//! current one (longest candidate first) and drop the first match. When
//! nothing matches the chunk is appended whole: a little repetition is
//! preferable to deleting real content.
//!
//! The matching is a heuristic. It can miss a reworded duplicate and it can
//! strip a short coincidental match; both are accepted.

use crate::pipeline::chunker::split_sentences;
use serde::{Deserialize, Serialize};

/// Number of trailing sentences tried as an overlap candidate.
const MAX_OVERLAP_SENTENCES: usize = 3;

/// One chunk after it came back from the rewrite backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaphrasedChunk {
    pub index: usize,
    pub original_text: String,
    pub rewritten_text: String,
}

/// Reassemble the document from rewritten chunks.
///
/// Chunks are ordered by `index` first, whatever order they arrive in.
pub fn reconstruct(mut chunks: Vec<ParaphrasedChunk>) -> String {
    chunks.sort_by_key(|c| c.index);

    let mut result = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            result.push_str(&chunk.rewritten_text);
            continue;
        }

        let cleaned = strip_overlap(&chunks[i - 1].rewritten_text, &chunk.rewritten_text);
        if cleaned.is_empty() {
            continue;
        }
        if !result.ends_with("\n\n") {
            result.push_str("\n\n");
        }
        result.push_str(cleaned);
    }

    result.trim().to_string()
}

/// Remove from the start of `current` the tail of `previous` it repeats.
fn strip_overlap<'a>(previous: &str, current: &'a str) -> &'a str {
    let current = current.trim_start();

    for candidate in overlap_candidates(previous) {
        if let Some(rest) = current.strip_prefix(candidate) {
            return rest.trim();
        }
    }

    current
}

/// The last 3, 2 and 1 sentences of `text`, longest first, trimmed.
fn overlap_candidates(text: &str) -> Vec<&str> {
    let sentences = split_sentences(text);
    let n = sentences.len();
    let take = n.min(MAX_OVERLAP_SENTENCES);

    let mut candidates = Vec::with_capacity(take);
    for k in (1..=take).rev() {
        let start: usize = sentences[..n - k].iter().map(|s| s.len()).sum();
        let candidate = text[start..].trim();
        if !candidate.is_empty() {
            candidates.push(candidate);
        }
    }
    candidates
}
