//! Result types for the eager API.

use crate::fidelity::FidelityReport;
use serde::Serialize;

/// A fully paraphrased document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaphraseOutput {
    /// The reconstructed, paraphrased document.
    pub text: String,
    /// Fidelity of `text` against the input.
    pub fidelity: FidelityReport,
    pub stats: ParaphraseStats,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaphraseStats {
    pub total_chunks: usize,
    pub original_chars: usize,
    pub paraphrased_chars: usize,
    pub original_words: usize,
    pub paraphrased_words: usize,
    /// Wall-clock time from first chunk to reconstruction, in milliseconds.
    pub duration_ms: u64,
}
