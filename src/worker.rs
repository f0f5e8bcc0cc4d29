//! Background job processing: submit a document, run it, persist progress.
//!
//! [`submit`] does the cheap synchronous part (extract, store, count chunks)
//! and returns a `Pending` job right away. [`run_job`] does the slow part:
//! it drives the engine and writes every event to the [`JobStore`] before
//! pulling the next one, so a client polling the store never sees progress
//! the store has not recorded yet.
//!
//! [`spawn_worker`] wires the two together with a bounded queue of job ids.
//! The worker runs one job at a time; concurrent jobs need more workers.

use crate::config::ParaphraseConfig;
use crate::document::{extract_text, DocumentFormat};
use crate::engine::ParaphraseEngine;
use crate::error::ParaphraseError;
use crate::fidelity;
use crate::job::{JobRecord, JobStore};
use crate::pipeline::chunker::TextChunker;
use crate::progress::ProgressEvent;
use crate::style::StyleConfig;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Capacity of the job id queue.
const QUEUE_CAPACITY: usize = 256;

/// Store an uploaded document and create a `Pending` job for it.
///
/// The format comes from `filename`'s extension. The chunk count is
/// computed up front so the job reports `total_chunks` before it starts.
pub async fn submit(
    store: &dyn JobStore,
    filename: &str,
    bytes: Vec<u8>,
    style: StyleConfig,
    config: &ParaphraseConfig,
) -> Result<JobRecord, ParaphraseError> {
    let format = DocumentFormat::from_path(Path::new(filename))?;
    let file_size = bytes.len() as u64;

    let extracted = tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| ParaphraseError::Internal(format!("Extraction task panicked: {}", e)))??;

    let document = store
        .create_document(filename, format, file_size, extracted.text)
        .await?;
    let total_chunks = TextChunker::from_config(config)
        .split(&document.content)
        .len();

    let job = store
        .create_job(document.document_id, style, total_chunks)
        .await?;
    info!(
        "Submitted job {} for '{}' ({} words, {} chunks)",
        job.job_id, filename, extracted.word_count, total_chunks
    );
    Ok(job)
}

/// Run one job to completion and return its final record.
///
/// A chunk failure is not an `Err`: the job is marked `Failed` and its
/// record returned. `Err` means the store itself could not be read or
/// written. Jobs that already finished are returned untouched.
pub async fn run_job(
    store: &dyn JobStore,
    engine: &ParaphraseEngine,
    job_id: Uuid,
) -> Result<JobRecord, ParaphraseError> {
    let job = store.get_job(job_id).await?;
    if job.status.is_terminal() {
        warn!("Job {} already {:?}; not re-running", job_id, job.status);
        return Ok(job);
    }
    let document = store.get_document(job.document_id).await?;

    info!("Starting job {} ({} chunks)", job_id, job.total_chunks);
    store.update_progress(job_id, 0, 0).await?;

    let mut events = engine.paraphrase(&document.content, &job.style);
    while let Some(event) = events.next().await {
        match event {
            ProgressEvent::Progress {
                percent,
                current_chunk,
                total_chunks,
            } => {
                info!(
                    "Job {}: chunk {}/{} ({}%)",
                    job_id, current_chunk, total_chunks, percent
                );
                store.update_progress(job_id, percent, current_chunk).await?;
            }
            ProgressEvent::Complete { result } => {
                let report = fidelity::assess(&document.content, &result);
                info!(
                    "Job {} complete: {} chars, fidelity score {} ({})",
                    job_id,
                    result.chars().count(),
                    report.score,
                    report.risk()
                );
                return store.complete_job(job_id, result, report.score).await;
            }
            ProgressEvent::Error { message } => {
                warn!("Job {} failed: {}", job_id, message);
                return store.fail_job(job_id, message).await;
            }
        }
    }

    store
        .fail_job(job_id, "Processing ended without a result".to_string())
        .await
}

// ── Queue ────────────────────────────────────────────────────────────────────

/// Handle for enqueuing jobs onto a worker started with [`spawn_worker`].
///
/// Cloneable. The worker stops once every handle is dropped and the queue
/// has drained.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Uuid>,
}

impl JobQueue {
    /// Queue a job for processing. Waits if the queue is full.
    pub async fn enqueue(&self, job_id: Uuid) -> Result<(), ParaphraseError> {
        self.tx
            .send(job_id)
            .await
            .map_err(|_| ParaphraseError::QueueClosed)
    }
}

/// Start a worker task that runs queued jobs one by one.
pub fn spawn_worker(
    store: Arc<dyn JobStore>,
    engine: ParaphraseEngine,
) -> (JobQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Uuid>(QUEUE_CAPACITY);

    let handle = tokio::spawn(async move {
        info!("Job worker started");
        while let Some(job_id) = rx.recv().await {
            if let Err(e) = run_job(store.as_ref(), &engine, job_id).await {
                error!("Job {} aborted: {}", job_id, e);
                if let Err(e) = store.fail_job(job_id, e.to_string()).await {
                    error!("Could not mark job {} as failed: {}", job_id, e);
                }
            }
        }
        info!("Job worker stopped: queue closed");
    });

    (JobQueue { tx }, handle)
}
