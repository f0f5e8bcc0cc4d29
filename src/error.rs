//! Error types for the edgequake-paraphrase library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ParaphraseError`]: **fatal**, the run cannot proceed at all
//!   (unreadable file, unsupported format, provider not configured, unknown
//!   job). Returned as `Err(ParaphraseError)` from the top-level functions.
//!
//! * [`RewriteError`]: a single chunk's rewrite call failed. The engine
//!   never retries it; it is folded into the terminal
//!   [`crate::progress::ProgressEvent::Error`] message and ends the run.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// All fatal errors returned by the edgequake-paraphrase library.
#[derive(Debug, Error)]
pub enum ParaphraseError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension does not map to a supported document format.
    #[error("Unsupported file type: '{format}' (expected pdf, docx or txt)")]
    UnsupportedFormat { format: String },

    /// The document was recognised but its text could not be extracted.
    #[error("Failed to extract text from {format} document: {detail}")]
    ExtractionFailed { format: String, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A chunk failed and the whole run was abandoned.
    #[error("{0}")]
    RewriteFailed(String),

    // ── Job store errors ──────────────────────────────────────────────────
    /// No job with this id exists in the store.
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// No document with this id exists in the store.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// The worker queue was shut down before the job could be enqueued.
    #[error("Job queue is closed")]
    QueueClosed,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single rewrite call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    /// The provider returned an error (network, rate limit, bad request).
    #[error("LLM API error: {detail}")]
    Api { detail: String },

    /// The provider answered but the cleaned response was empty.
    #[error("No response from LLM provider")]
    EmptyResponse,

    /// The call did not finish within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },
}
