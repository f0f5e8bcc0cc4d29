//! Pipeline stages for document paraphrasing.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the network-bound stage can be swapped out.
//!
//! ## Data Flow
//!
//! ```text
//! chunker ──▶ rewrite ──▶ postprocess ──▶ reconstruct
//! (overlap)   (LLM call)  (cleanup)       (stitch seams)
//! ```
//!
//! 1. [`chunker`]    : split the document into overlapping chunks
//! 2. [`rewrite`]    : the only stage with network I/O; one call per chunk
//! 3. [`postprocess`]: strip fences, preambles and invisible characters
//! 4. [`reconstruct`]: join rewritten chunks, dropping repeated overlap

pub mod chunker;
pub mod postprocess;
pub mod reconstruct;
pub mod rewrite;
