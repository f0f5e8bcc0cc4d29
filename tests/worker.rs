//! Integration tests for job submission and background processing.

use async_trait::async_trait;
use edgequake_paraphrase::{
    run_job, spawn_worker, submit, DocumentFormat, DocumentRecord, InMemoryJobStore, JobRecord,
    JobStatus, JobStore, ParaphraseConfig, ParaphraseEngine, ParaphraseError, RewriteError,
    Rewriter, Stage, StyleConfig,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Shared log of what happened, in order, across rewriter and store.
type Timeline = Arc<Mutex<Vec<String>>>;

/// Upper-cases each chunk. Fails on the chunk whose 1-based position is
/// `fail_at`.
struct UpperRewriter {
    timeline: Timeline,
    fail_at: Option<usize>,
}

#[async_trait]
impl Rewriter for UpperRewriter {
    async fn rewrite(&self, text: &str, _style: &StyleConfig) -> Result<String, RewriteError> {
        let mut log = self.timeline.lock().unwrap();
        let call = log.iter().filter(|e| e.starts_with("rewrite")).count() + 1;
        log.push(format!("rewrite {call}"));
        if self.fail_at == Some(call) {
            return Err(RewriteError::Timeout { secs: 30 });
        }
        Ok(text.to_uppercase())
    }
}

/// Delegates to an in-memory store and logs every progress write.
struct RecordingStore {
    inner: InMemoryJobStore,
    timeline: Timeline,
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn create_document(
        &self,
        filename: &str,
        file_type: DocumentFormat,
        file_size: u64,
        content: String,
    ) -> Result<DocumentRecord, ParaphraseError> {
        self.inner
            .create_document(filename, file_type, file_size, content)
            .await
    }

    async fn get_document(&self, document_id: Uuid) -> Result<DocumentRecord, ParaphraseError> {
        self.inner.get_document(document_id).await
    }

    async fn create_job(
        &self,
        document_id: Uuid,
        style: StyleConfig,
        total_chunks: usize,
    ) -> Result<JobRecord, ParaphraseError> {
        self.inner.create_job(document_id, style, total_chunks).await
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        progress: u8,
        current_chunk: usize,
    ) -> Result<JobRecord, ParaphraseError> {
        self.timeline
            .lock()
            .unwrap()
            .push(format!("progress {current_chunk}"));
        self.inner
            .update_progress(job_id, progress, current_chunk)
            .await
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        result: String,
        fidelity_score: u8,
    ) -> Result<JobRecord, ParaphraseError> {
        self.timeline.lock().unwrap().push("complete".into());
        self.inner.complete_job(job_id, result, fidelity_score).await
    }

    async fn fail_job(&self, job_id: Uuid, error: String) -> Result<JobRecord, ParaphraseError> {
        self.timeline.lock().unwrap().push("fail".into());
        self.inner.fail_job(job_id, error).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord, ParaphraseError> {
        self.inner.get_job(job_id).await
    }
}

const THREE_PARAGRAPHS: &str =
    "First paragraph is here.\n\nSecond paragraph is here.\n\nThird paragraph is here.";

fn config() -> ParaphraseConfig {
    ParaphraseConfig::builder()
        .max_chunk_size(40)
        .overlap_size(0)
        .chunk_delay_ms(0)
        .build()
        .unwrap()
}

fn engine(timeline: &Timeline, fail_at: Option<usize>) -> ParaphraseEngine {
    let rewriter = Arc::new(UpperRewriter {
        timeline: timeline.clone(),
        fail_at,
    });
    ParaphraseEngine::new(rewriter, &config())
}

async fn submit_text(store: &dyn JobStore, text: &str) -> JobRecord {
    submit(
        store,
        "notes.txt",
        text.as_bytes().to_vec(),
        StyleConfig::default(),
        &config(),
    )
    .await
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_creates_pending_job_with_chunk_count() {
    let store = InMemoryJobStore::new();
    let job = submit_text(&store, THREE_PARAGRAPHS).await;

    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.total_chunks, 3);
    assert_eq!(job.progress, 0);
    assert_eq!(job.stage(), Stage::AnalyzeChunk);

    let doc = store.get_document(job.document_id).await.unwrap();
    assert_eq!(doc.filename, "notes.txt");
    assert_eq!(doc.file_type, DocumentFormat::Txt);
    assert_eq!(doc.file_size, THREE_PARAGRAPHS.len() as u64);
    assert_eq!(doc.content, THREE_PARAGRAPHS);
}

#[tokio::test]
async fn submit_rejects_unknown_extension() {
    let store = InMemoryJobStore::new();
    let err = submit(
        &store,
        "slides.pptx",
        b"whatever".to_vec(),
        StyleConfig::default(),
        &config(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParaphraseError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn run_job_completes_and_scores() {
    let timeline = Timeline::default();
    let store = InMemoryJobStore::new();
    let job = submit_text(&store, THREE_PARAGRAPHS).await;

    let done = run_job(&store, &engine(&timeline, None), job.job_id)
        .await
        .unwrap();

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(done.current_chunk, 3);
    assert_eq!(
        done.result.as_deref(),
        Some(
            "FIRST PARAGRAPH IS HERE.\n\nSECOND PARAGRAPH IS HERE.\n\nTHIRD PARAGRAPH IS HERE."
        )
    );
    // Case is normalised away, so the rewrite scores as faithful.
    assert_eq!(done.fidelity_score, Some(0));
    assert!(done.error.is_none());
    assert_eq!(done.stage(), Stage::Finalize);

    let stored = store.get_job(job.job_id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.result, done.result);
}

#[tokio::test]
async fn progress_is_persisted_before_next_chunk() {
    let timeline = Timeline::default();
    let store = RecordingStore {
        inner: InMemoryJobStore::new(),
        timeline: timeline.clone(),
    };
    let job = submit_text(&store, THREE_PARAGRAPHS).await;

    run_job(&store, &engine(&timeline, None), job.job_id)
        .await
        .unwrap();

    let log = timeline.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "progress 0",
            "rewrite 1",
            "progress 1",
            "rewrite 2",
            "progress 2",
            "rewrite 3",
            "progress 3",
            "complete",
        ]
    );
}

#[tokio::test]
async fn chunk_failure_marks_job_failed() {
    let timeline = Timeline::default();
    let store = InMemoryJobStore::new();
    let job = submit_text(&store, THREE_PARAGRAPHS).await;

    let failed = run_job(&store, &engine(&timeline, Some(2)), job.job_id)
        .await
        .unwrap();

    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.current_chunk, 1);
    assert_eq!(failed.progress, 33);
    assert!(failed.result.is_none());
    let message = failed.error.unwrap_or_default();
    assert!(message.starts_with("Failed at chunk 2/3"), "got {message}");
    assert!(message.contains("timed out"), "got {message}");
}

#[tokio::test]
async fn finished_jobs_are_not_rerun() {
    let timeline = Timeline::default();
    let store = InMemoryJobStore::new();
    let job = submit_text(&store, "Just one paragraph.").await;
    let engine = engine(&timeline, None);

    let first = run_job(&store, &engine, job.job_id).await.unwrap();
    let calls = timeline.lock().unwrap().len();
    let second = run_job(&store, &engine, job.job_id).await.unwrap();

    assert_eq!(first.status, JobStatus::Completed);
    assert_eq!(second.result, first.result);
    assert_eq!(second.updated_at, first.updated_at);
    assert_eq!(timeline.lock().unwrap().len(), calls);
}

#[tokio::test]
async fn run_job_unknown_id() {
    let store = InMemoryJobStore::new();
    let err = run_job(&store, &engine(&Timeline::default(), None), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ParaphraseError::JobNotFound(_)));
}

#[tokio::test]
async fn worker_drains_queue_then_stops() {
    let timeline = Timeline::default();
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let a = submit_text(store.as_ref(), THREE_PARAGRAPHS).await;
    let b = submit_text(store.as_ref(), "Another short note.").await;

    let (queue, handle) = spawn_worker(store.clone(), engine(&timeline, None));
    queue.enqueue(a.job_id).await.unwrap();
    queue.enqueue(b.job_id).await.unwrap();
    drop(queue);
    handle.await.unwrap();

    for id in [a.job_id, b.job_id] {
        let job = store.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed, "job {id}");
    }
}

#[tokio::test]
async fn worker_survives_unknown_job_ids() {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let (queue, handle) = spawn_worker(store.clone(), engine(&Timeline::default(), None));

    // Unknown job ids are logged and skipped; the worker keeps going.
    queue.enqueue(Uuid::new_v4()).await.unwrap();
    let job = submit_text(store.as_ref(), "Still processed.").await;
    queue.enqueue(job.job_id).await.unwrap();
    drop(queue);
    handle.await.unwrap();

    assert_eq!(
        store.get_job(job.job_id).await.unwrap().status,
        JobStatus::Completed
    );
}
