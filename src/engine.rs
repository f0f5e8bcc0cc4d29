//! Streaming paraphrasing engine.
//!
//! [`ParaphraseEngine::paraphrase`] returns a lazy [`ProgressStream`]: no
//! chunk is sent to the backend until the caller polls for the next event,
//! so a caller that persists each event before pulling the next one never
//! falls behind the backend.
//!
//! Chunks are rewritten strictly one after another, in index order, with a
//! fixed pause between calls. The first failure ends the run with an
//! [`ProgressEvent::Error`]; no partial document is produced and no later
//! chunk is attempted.
//!
//! Dropping the stream abandons the run: no further chunk is started. Each
//! rewrite call runs on its own task, so a call already in flight still
//! runs to completion; its result is discarded.

use crate::config::ParaphraseConfig;
use crate::error::RewriteError;
use crate::pipeline::chunker::{Chunk, TextChunker};
use crate::pipeline::reconstruct::{reconstruct, ParaphrasedChunk};
use crate::pipeline::rewrite::Rewriter;
use crate::progress::ProgressEvent;
use crate::style::StyleConfig;
use futures::stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of progress events.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ProgressEvent> + Send>>;

/// Drives chunks through a [`Rewriter`] and reassembles the result.
///
/// Holds no per-run state: every call to [`paraphrase`](Self::paraphrase)
/// re-chunks the text and starts from scratch, so one engine can serve many
/// concurrent jobs.
#[derive(Clone)]
pub struct ParaphraseEngine {
    rewriter: Arc<dyn Rewriter>,
    chunker: TextChunker,
    chunk_delay: Duration,
}

impl ParaphraseEngine {
    pub fn new(rewriter: Arc<dyn Rewriter>, config: &ParaphraseConfig) -> Self {
        Self {
            rewriter,
            chunker: TextChunker::from_config(config),
            chunk_delay: config.chunk_delay(),
        }
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    /// Chunk `text` the way [`paraphrase`](Self::paraphrase) would.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.chunker.split(text)
    }

    /// Paraphrase `text`, yielding progress as each chunk completes.
    ///
    /// Empty input yields a single `Complete { result: "" }`.
    ///
    /// Each rewrite call runs on a `tokio::spawn`ed task, so the stream must
    /// be polled inside a Tokio runtime. Polling it elsewhere panics.
    pub fn paraphrase(&self, text: &str, style: &StyleConfig) -> ProgressStream {
        let chunks = self.chunker.split(text);
        info!("Processing document in {} chunks", chunks.len());

        let run = Run {
            rewriter: Arc::clone(&self.rewriter),
            style: style.clone(),
            delay: self.chunk_delay,
            total: chunks.len(),
            pending: chunks.into_iter(),
            done: Vec::new(),
            finished: false,
        };

        Box::pin(stream::unfold(run, |mut run| async move {
            let event = run.step().await?;
            Some((event, run))
        }))
    }
}

/// State of one paraphrasing run, owned by its stream.
struct Run {
    rewriter: Arc<dyn Rewriter>,
    style: StyleConfig,
    delay: Duration,
    total: usize,
    pending: std::vec::IntoIter<Chunk>,
    done: Vec<ParaphrasedChunk>,
    finished: bool,
}

impl Run {
    async fn step(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }

        let Some(chunk) = self.pending.next() else {
            self.finished = true;
            let result = reconstruct(std::mem::take(&mut self.done));
            info!("Reconstructed document: {} chars", result.chars().count());
            return Some(ProgressEvent::Complete { result });
        };

        let position = chunk.index + 1;
        if chunk.index > 0 && !self.delay.is_zero() {
            debug!("Waiting {:?} before chunk {}", self.delay, position);
            sleep(self.delay).await;
        }

        info!("Processing chunk {}/{}", position, self.total);
        match self.rewrite(&chunk.text).await {
            Ok(rewritten) => {
                self.done.push(ParaphrasedChunk {
                    index: chunk.index,
                    original_text: chunk.text,
                    rewritten_text: rewritten,
                });
                Some(ProgressEvent::progress(self.done.len(), self.total))
            }
            Err(e) => {
                warn!("Chunk {}/{} failed: {}", position, self.total, e);
                self.finished = true;
                Some(ProgressEvent::Error {
                    message: format!("Failed at chunk {}/{}: {}", position, self.total, e),
                })
            }
        }
    }

    /// Rewrite one chunk on a detached task.
    async fn rewrite(&self, text: &str) -> Result<String, RewriteError> {
        let rewriter = Arc::clone(&self.rewriter);
        let style = self.style.clone();
        let text = text.to_string();

        tokio::spawn(async move { rewriter.rewrite(&text, &style).await })
            .await
            .map_err(|e| RewriteError::Api {
                detail: format!("rewrite task failed: {}", e),
            })?
    }
}
