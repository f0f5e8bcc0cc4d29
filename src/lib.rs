//! # edgequake-paraphrase
//!
//! Paraphrase whole documents with an LLM while keeping an eye on how far
//! the rewrite drifted from the source.
//!
//! ## Why this crate?
//!
//! A document longer than a model's comfortable context has to be split,
//! and naive splitting leaves visible seams: sentences cut in half, ideas
//! restated twice where two chunks meet. This crate splits on paragraph and
//! sentence boundaries, repeats a little context at the start of each
//! chunk, rewrites the chunks one at a time, and removes the repeated text
//! again when stitching the results together. A cheap, deterministic
//! fidelity score then flags rewrites that lost or invented content.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text
//!  │
//!  ├─ 1. Chunk        paragraph/sentence split with overlap seed
//!  ├─ 2. Rewrite      one LLM call per chunk, strictly in order
//!  ├─ 3. Clean        strip fences, preambles, invisible characters
//!  ├─ 4. Reconstruct  join chunks, drop repeated overlap
//!  └─ 5. Score        0–100 fidelity risk from four heuristics
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paraphrase::{paraphrase_file, ParaphraseConfig, StyleConfig, Tone};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENROUTER_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = ParaphraseConfig::default();
//!     let style = StyleConfig::default().with_tone(Tone::Formal);
//!     let output = paraphrase_file("essay.txt", &style, &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("fidelity: {} ({})", output.fidelity.score, output.fidelity.risk());
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! [`ParaphraseEngine::paraphrase`] yields a [`ProgressEvent`] per finished
//! chunk and ends with exactly one `Complete` or `Error`. The stream is lazy:
//! the next chunk is only sent once the previous event has been consumed.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paraphrase` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `pdf`   | on      | PDF extraction (`pdf-extract`) and rendering (`lopdf`) |
//! | `docx`  | on      | Word extraction and rendering via `docx-rs` |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-paraphrase = { version = "0.1", default-features = false, features = ["pdf", "docx"] }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod engine;
pub mod error;
pub mod fidelity;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod style;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ParaphraseConfig, ParaphraseConfigBuilder, DEFAULT_MODEL};
pub use convert::{
    paraphrase_file, paraphrase_file_with, paraphrase_sync, paraphrase_text, paraphrase_to_file,
    paraphrase_with_engine, write_output,
};
pub use document::{
    count_words, extract_text, read_document, render_document, DocumentFormat,
    ExtractedDocument,
};
pub use engine::{ParaphraseEngine, ProgressStream};
pub use error::{ParaphraseError, RewriteError};
pub use fidelity::{assess, score, FidelityReport, RiskLevel};
pub use job::{
    DocumentRecord, InMemoryJobStore, JobRecord, JobStatus, JobStore, Stage, StageStatus,
};
pub use output::{ParaphraseOutput, ParaphraseStats};
pub use pipeline::chunker::{Chunk, TextChunker};
pub use pipeline::reconstruct::{reconstruct, ParaphrasedChunk};
pub use pipeline::rewrite::{resolve_provider, LlmRewriter, Rewriter};
pub use progress::ProgressEvent;
pub use style::{Creativity, Formality, StyleConfig, Tone};
pub use worker::{run_job, spawn_worker, submit, JobQueue};
