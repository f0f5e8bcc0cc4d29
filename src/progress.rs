//! Progress events emitted by the paraphrasing engine.
//!
//! A run yields one [`ProgressEvent::Progress`] per successfully rewritten
//! chunk, then exactly one terminal event: [`ProgressEvent::Complete`] or
//! [`ProgressEvent::Error`]. Nothing follows a terminal event.
//!
//! Events serialise as `{"type": "progress", "percent": 50, ...}` so they can
//! be written straight to an NDJSON response or log.

use serde::{Deserialize, Serialize};

/// One unit of engine output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A chunk finished. `current_chunk` is 1-based.
    #[serde(rename_all = "camelCase")]
    Progress {
        percent: u8,
        current_chunk: usize,
        total_chunks: usize,
    },
    /// Every chunk succeeded; `result` is the reconstructed document.
    Complete { result: String },
    /// A chunk failed; the run stopped.
    Error { message: String },
}

impl ProgressEvent {
    /// Build a progress event, rounding the percentage to the nearest integer.
    pub fn progress(current_chunk: usize, total_chunks: usize) -> Self {
        let percent = if total_chunks == 0 {
            100
        } else {
            ((current_chunk as f64 / total_chunks as f64) * 100.0)
                .round()
                .clamp(0.0, 100.0) as u8
        };
        ProgressEvent::Progress {
            percent,
            current_chunk,
            total_chunks,
        }
    }

    /// `true` for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }

    /// Percentage carried by this event; `Complete` counts as 100.
    pub fn percent(&self) -> Option<u8> {
        match self {
            ProgressEvent::Progress { percent, .. } => Some(*percent),
            ProgressEvent::Complete { .. } => Some(100),
            ProgressEvent::Error { .. } => None,
        }
    }

    /// Serialise as a single NDJSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
