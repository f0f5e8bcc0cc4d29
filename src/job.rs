//! Job and document persistence.
//!
//! The engine itself is stateless. Anything a client polls for (status,
//! progress, the final result and its fidelity score) lives behind the
//! [`JobStore`] trait. [`InMemoryJobStore`] is the bundled implementation;
//! a database-backed store only needs to implement the same seven methods.
//!
//! ## Lifecycle
//!
//! ```text
//! create_job ──▶ Pending ──▶ Processing ──┬──▶ Completed (progress = 100)
//!                            (update_progress)   └──▶ Failed (error set)
//! ```

use crate::document::DocumentFormat;
use crate::error::ParaphraseError;
use crate::style::StyleConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// An uploaded document and its extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_id: Uuid,
    pub filename: String,
    pub file_type: DocumentFormat,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
    /// Extracted plain text; this is what gets paraphrased.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// One paraphrasing run over a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: Uuid,
    pub document_id: Uuid,
    pub status: JobStatus,
    /// 0..=100.
    pub progress: u8,
    /// Number of chunks finished so far.
    pub current_chunk: usize,
    pub total_chunks: usize,
    pub style: StyleConfig,
    pub error: Option<String>,
    /// Set once the job completes.
    pub result: Option<String>,
    /// Set once the job completes.
    pub fidelity_score: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn stage(&self) -> Stage {
        Stage::infer(self)
    }
}

/// Persistence contract used by the worker.
///
/// Every method fails with [`ParaphraseError::JobNotFound`] or
/// [`ParaphraseError::DocumentNotFound`] for unknown ids.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_document(
        &self,
        filename: &str,
        file_type: DocumentFormat,
        file_size: u64,
        content: String,
    ) -> Result<DocumentRecord, ParaphraseError>;

    async fn get_document(&self, document_id: Uuid) -> Result<DocumentRecord, ParaphraseError>;

    /// Create a `Pending` job with zero progress.
    async fn create_job(
        &self,
        document_id: Uuid,
        style: StyleConfig,
        total_chunks: usize,
    ) -> Result<JobRecord, ParaphraseError>;

    /// Record progress and move the job to `Processing`.
    async fn update_progress(
        &self,
        job_id: Uuid,
        progress: u8,
        current_chunk: usize,
    ) -> Result<JobRecord, ParaphraseError>;

    /// Store the result and score; sets `Completed` and progress 100.
    async fn complete_job(
        &self,
        job_id: Uuid,
        result: String,
        fidelity_score: u8,
    ) -> Result<JobRecord, ParaphraseError>;

    async fn fail_job(&self, job_id: Uuid, error: String) -> Result<JobRecord, ParaphraseError>;

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord, ParaphraseError>;
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// [`JobStore`] kept entirely in process memory.
///
/// Records are lost on restart. Suitable for the CLI, tests and
/// single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    documents: RwLock<HashMap<Uuid, DocumentRecord>>,
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to a job under the write lock and return the updated copy.
    async fn modify_job<F>(&self, job_id: Uuid, f: F) -> Result<JobRecord, ParaphraseError>
    where
        F: FnOnce(&mut JobRecord) + Send,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(ParaphraseError::JobNotFound(job_id))?;
        f(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_document(
        &self,
        filename: &str,
        file_type: DocumentFormat,
        file_size: u64,
        content: String,
    ) -> Result<DocumentRecord, ParaphraseError> {
        let record = DocumentRecord {
            document_id: Uuid::new_v4(),
            filename: filename.to_string(),
            file_type,
            file_size,
            content,
            created_at: Utc::now(),
        };
        debug!("Stored document {} ({})", record.document_id, filename);
        self.documents
            .write()
            .await
            .insert(record.document_id, record.clone());
        Ok(record)
    }

    async fn get_document(&self, document_id: Uuid) -> Result<DocumentRecord, ParaphraseError> {
        self.documents
            .read()
            .await
            .get(&document_id)
            .cloned()
            .ok_or(ParaphraseError::DocumentNotFound(document_id))
    }

    async fn create_job(
        &self,
        document_id: Uuid,
        style: StyleConfig,
        total_chunks: usize,
    ) -> Result<JobRecord, ParaphraseError> {
        if !self.documents.read().await.contains_key(&document_id) {
            return Err(ParaphraseError::DocumentNotFound(document_id));
        }

        let now = Utc::now();
        let record = JobRecord {
            job_id: Uuid::new_v4(),
            document_id,
            status: JobStatus::Pending,
            progress: 0,
            current_chunk: 0,
            total_chunks,
            style,
            error: None,
            result: None,
            fidelity_score: None,
            created_at: now,
            updated_at: now,
        };
        debug!("Created job {} for document {}", record.job_id, document_id);
        self.jobs.write().await.insert(record.job_id, record.clone());
        Ok(record)
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        progress: u8,
        current_chunk: usize,
    ) -> Result<JobRecord, ParaphraseError> {
        self.modify_job(job_id, |job| {
            job.status = JobStatus::Processing;
            job.progress = progress.min(100);
            job.current_chunk = current_chunk;
        })
        .await
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        result: String,
        fidelity_score: u8,
    ) -> Result<JobRecord, ParaphraseError> {
        self.modify_job(job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.result = Some(result);
            job.fidelity_score = Some(fidelity_score);
        })
        .await
    }

    async fn fail_job(&self, job_id: Uuid, error: String) -> Result<JobRecord, ParaphraseError> {
        self.modify_job(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error);
        })
        .await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<JobRecord, ParaphraseError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(ParaphraseError::JobNotFound(job_id))
    }
}

// ── Stage inference ──────────────────────────────────────────────────────────

/// Coarse pipeline stage shown to a user polling a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    UploadParse,
    AnalyzeChunk,
    Paraphrase,
    QualityCheck,
    Finalize,
}

/// Display state of one stage relative to the job's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Complete,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::UploadParse,
        Stage::AnalyzeChunk,
        Stage::Paraphrase,
        Stage::QualityCheck,
        Stage::Finalize,
    ];

    /// Derive the stage from a job's status and counters.
    ///
    /// Rules, first match wins:
    /// 1. `Completed` → `Finalize`
    /// 2. progress ≥ 95 and every chunk done → `QualityCheck`
    /// 3. some chunks done → `Paraphrase`
    /// 4. chunks counted, none done → `AnalyzeChunk`
    /// 5. otherwise → `UploadParse`
    pub fn infer(job: &JobRecord) -> Self {
        let (current, total) = (job.current_chunk, job.total_chunks);
        if job.status == JobStatus::Completed {
            Stage::Finalize
        } else if job.progress >= 95 && total > 0 && current == total {
            Stage::QualityCheck
        } else if current > 0 && current <= total {
            Stage::Paraphrase
        } else if total > 0 && current == 0 {
            Stage::AnalyzeChunk
        } else {
            Stage::UploadParse
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::UploadParse => "Upload & Parsing",
            Stage::AnalyzeChunk => "Analysis & Chunking",
            Stage::Paraphrase => "AI Paraphrasing",
            Stage::QualityCheck => "Quality Check",
            Stage::Finalize => "Finalization",
        }
    }

    /// How this stage should be displayed when the job is at `current`.
    ///
    /// A completed job shows every stage as complete.
    pub fn status_at(&self, current: Stage, job_status: JobStatus) -> StageStatus {
        if job_status == JobStatus::Completed || *self < current {
            StageStatus::Complete
        } else if *self == current {
            StageStatus::InProgress
        } else {
            StageStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus, progress: u8, current: usize, total: usize) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            job_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            status,
            progress,
            current_chunk: current,
            total_chunks: total,
            style: StyleConfig::default(),
            error: None,
            result: None,
            fidelity_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stage_inference() {
        assert_eq!(
            Stage::infer(&job(JobStatus::Completed, 100, 3, 3)),
            Stage::Finalize
        );
        assert_eq!(
            Stage::infer(&job(JobStatus::Processing, 100, 3, 3)),
            Stage::QualityCheck
        );
        assert_eq!(
            Stage::infer(&job(JobStatus::Processing, 67, 2, 3)),
            Stage::Paraphrase
        );
        assert_eq!(
            Stage::infer(&job(JobStatus::Pending, 0, 0, 3)),
            Stage::AnalyzeChunk
        );
        assert_eq!(
            Stage::infer(&job(JobStatus::Pending, 0, 0, 0)),
            Stage::UploadParse
        );
        // Failed jobs keep the stage they failed in.
        assert_eq!(
            Stage::infer(&job(JobStatus::Failed, 33, 1, 3)),
            Stage::Paraphrase
        );
    }

    #[test]
    fn stage_status_display() {
        let current = Stage::Paraphrase;
        assert_eq!(
            Stage::AnalyzeChunk.status_at(current, JobStatus::Processing),
            StageStatus::Complete
        );
        assert_eq!(
            Stage::Paraphrase.status_at(current, JobStatus::Processing),
            StageStatus::InProgress
        );
        assert_eq!(
            Stage::Finalize.status_at(current, JobStatus::Processing),
            StageStatus::Pending
        );
        assert_eq!(
            Stage::Finalize.status_at(Stage::Finalize, JobStatus::Completed),
            StageStatus::Complete
        );
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let store = InMemoryJobStore::new();
        let doc = store
            .create_document("a.txt", DocumentFormat::Txt, 12, "Hello world.".into())
            .await
            .unwrap();
        let created = store
            .create_job(doc.document_id, StyleConfig::default(), 2)
            .await
            .unwrap();
        assert_eq!(created.status, JobStatus::Pending);
        assert_eq!(created.progress, 0);

        let updated = store.update_progress(created.job_id, 50, 1).await.unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.current_chunk, 1);
        assert!(updated.updated_at >= created.updated_at);

        let done = store
            .complete_job(created.job_id, "Hi world.".into(), 12)
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.result.as_deref(), Some("Hi world."));
        assert_eq!(done.fidelity_score, Some(12));
        assert_eq!(done.stage(), Stage::Finalize);

        let fetched = store.get_job(created.job_id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn fail_keeps_progress() {
        let store = InMemoryJobStore::new();
        let doc = store
            .create_document("a.txt", DocumentFormat::Txt, 1, "x".into())
            .await
            .unwrap();
        let job = store
            .create_job(doc.document_id, StyleConfig::default(), 3)
            .await
            .unwrap();
        store.update_progress(job.job_id, 33, 1).await.unwrap();
        let failed = store
            .fail_job(job.job_id, "Failed at chunk 2/3: boom".into())
            .await
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.progress, 33);
        assert_eq!(failed.error.as_deref(), Some("Failed at chunk 2/3: boom"));
        assert!(failed.status.is_terminal());
    }

    #[tokio::test]
    async fn unknown_ids() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get_job(id).await,
            Err(ParaphraseError::JobNotFound(x)) if x == id
        ));
        assert!(matches!(
            store.update_progress(id, 10, 1).await,
            Err(ParaphraseError::JobNotFound(_))
        ));
        assert!(matches!(
            store.get_document(id).await,
            Err(ParaphraseError::DocumentNotFound(_))
        ));
        assert!(matches!(
            store.create_job(id, StyleConfig::default(), 1).await,
            Err(ParaphraseError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn job_record_json_is_camel_case() {
        let j = job(JobStatus::Processing, 50, 1, 2);
        let v = serde_json::to_value(&j).unwrap();
        assert_eq!(v["status"], "processing");
        assert_eq!(v["currentChunk"], 1);
        assert_eq!(v["totalChunks"], 2);
        assert!(v.get("fidelityScore").is_some());
    }
}
