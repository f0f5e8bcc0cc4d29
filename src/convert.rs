//! Eager (whole-document) paraphrasing entry points.
//!
//! ## Why eager vs. streaming?
//!
//! These functions wait for the last chunk, then return the finished
//! document with its fidelity report and run statistics. Use
//! [`ParaphraseEngine::paraphrase`] directly when you need each progress
//! event as it happens, or [`crate::worker`] when the run should outlive
//! the request that started it.

use crate::config::ParaphraseConfig;
use crate::document::{read_document, render_document, DocumentFormat};
use crate::engine::ParaphraseEngine;
use crate::error::ParaphraseError;
use crate::fidelity;
use crate::output::{ParaphraseOutput, ParaphraseStats};
use crate::pipeline::rewrite::{LlmRewriter, Rewriter};
use crate::progress::ProgressEvent;
use crate::style::StyleConfig;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Paraphrase `text` with the given backend and wait for the result.
///
/// # Errors
/// [`ParaphraseError::RewriteFailed`] carrying the engine's
/// `"Failed at chunk i/n: ..."` message if any chunk fails.
pub async fn paraphrase_text(
    text: &str,
    style: &StyleConfig,
    rewriter: Arc<dyn Rewriter>,
    config: &ParaphraseConfig,
) -> Result<ParaphraseOutput, ParaphraseError> {
    let engine = ParaphraseEngine::new(rewriter, config);
    paraphrase_with_engine(&engine, text, style, |_| {}).await
}

/// Like [`paraphrase_text`], but hands every event to `on_event` as it
/// arrives (the CLI feeds its progress bar this way).
pub async fn paraphrase_with_engine<F>(
    engine: &ParaphraseEngine,
    text: &str,
    style: &StyleConfig,
    mut on_event: F,
) -> Result<ParaphraseOutput, ParaphraseError>
where
    F: FnMut(&ProgressEvent),
{
    let start = Instant::now();
    let mut total_chunks = 0;
    let mut events = engine.paraphrase(text, style);

    while let Some(event) = events.next().await {
        on_event(&event);
        match event {
            ProgressEvent::Progress {
                total_chunks: total,
                ..
            } => total_chunks = total,
            ProgressEvent::Complete { result } => {
                return Ok(build_output(
                    text,
                    result,
                    total_chunks,
                    start.elapsed().as_millis() as u64,
                ));
            }
            ProgressEvent::Error { message } => {
                return Err(ParaphraseError::RewriteFailed(message));
            }
        }
    }

    Err(ParaphraseError::Internal(
        "paraphrase stream ended without a terminal event".to_string(),
    ))
}

fn build_output(
    original: &str,
    result: String,
    total_chunks: usize,
    duration_ms: u64,
) -> ParaphraseOutput {
    let fidelity = fidelity::assess(original, &result);
    let stats = ParaphraseStats {
        total_chunks,
        original_chars: original.chars().count(),
        paraphrased_chars: result.chars().count(),
        original_words: crate::document::count_words(original),
        paraphrased_words: crate::document::count_words(&result),
        duration_ms,
    };

    info!(
        "Paraphrase complete: {} chunks, {}ms, fidelity score {} ({})",
        stats.total_chunks,
        stats.duration_ms,
        fidelity.score,
        fidelity.risk()
    );

    ParaphraseOutput {
        text: result,
        fidelity,
        stats,
    }
}

/// Extract a document from disk and paraphrase it with an LLM backend.
///
/// The provider is resolved from `config` (see
/// [`crate::pipeline::rewrite::resolve_provider`]); `style.model` overrides
/// the configured model.
pub async fn paraphrase_file(
    path: impl AsRef<Path>,
    style: &StyleConfig,
    config: &ParaphraseConfig,
) -> Result<ParaphraseOutput, ParaphraseError> {
    let rewriter: Arc<dyn Rewriter> = Arc::new(LlmRewriter::from_config(config, style)?);
    paraphrase_file_with(path, style, rewriter, config).await
}

/// [`paraphrase_file`] with an explicit backend.
pub async fn paraphrase_file_with(
    path: impl AsRef<Path>,
    style: &StyleConfig,
    rewriter: Arc<dyn Rewriter>,
    config: &ParaphraseConfig,
) -> Result<ParaphraseOutput, ParaphraseError> {
    let path = path.as_ref();
    info!("Starting paraphrase: {}", path.display());
    let (_format, document) = read_document(path).await?;
    paraphrase_text(&document.text, style, rewriter, config).await
}

/// Paraphrase `input` and write the result to `output`.
///
/// The output format follows `output`'s extension.
pub async fn paraphrase_to_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    style: &StyleConfig,
    config: &ParaphraseConfig,
) -> Result<ParaphraseOutput, ParaphraseError> {
    let result = paraphrase_file(input, style, config).await?;
    write_output(output, &result.text).await?;
    Ok(result)
}

/// Render `text` in the format implied by `path` and write it atomically.
///
/// Uses a temp file + rename so readers never see a partial file.
pub async fn write_output(path: impl AsRef<Path>, text: &str) -> Result<(), ParaphraseError> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let bytes = render_document(text, format)?;

    let write_failed = |source| ParaphraseError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Synchronous wrapper around [`paraphrase_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn paraphrase_sync(
    path: impl AsRef<Path>,
    style: &StyleConfig,
    config: &ParaphraseConfig,
) -> Result<ParaphraseOutput, ParaphraseError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ParaphraseError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(paraphrase_file(path, style, config))
}
