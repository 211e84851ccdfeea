//! Stage runners: drive one compute stage end-to-end.
//!
//! A runner loads the job, flips the stage to `running` (committed before
//! any network I/O so concurrent readers see the in-flight state), dispatches
//! the stage service, persists the returned payload as an artifact, and flips
//! the stage to its terminal status. Failures are recorded on the job with a
//! stage-prefixed message before being re-raised to the orchestrator.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use lecta_db::{JobRepository, LectureRepository};
use lecta_models::{Job, JobId, Lecture, Stage};
use lecta_stage_client::StageClient;
use lecta_storage::ArtifactStore;

use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;

/// Executes single stages against one job.
#[derive(Clone)]
pub struct StageRunner {
    jobs: JobRepository,
    lectures: LectureRepository,
    store: ArtifactStore,
    client: Arc<StageClient>,
}

impl StageRunner {
    pub fn new(
        jobs: JobRepository,
        lectures: LectureRepository,
        store: ArtifactStore,
        client: Arc<StageClient>,
    ) -> Self {
        Self {
            jobs,
            lectures,
            store,
            client,
        }
    }

    /// Run the visual-text extraction stage.
    pub async fn run_extraction(&self, job_id: &JobId) -> PipelineResult<Value> {
        self.run_video_stage(job_id, Stage::Extraction).await
    }

    /// Run the audio transcription stage.
    pub async fn run_transcription(&self, job_id: &JobId) -> PipelineResult<Value> {
        self.run_video_stage(job_id, Stage::Transcription).await
    }

    async fn load_job(&self, job_id: &JobId) -> PipelineResult<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {job_id}")))
    }

    /// Shared algorithm for the two attachment-bearing stages. The dispatch
    /// happens at most once; there is no retry around the video upload.
    async fn run_video_stage(&self, job_id: &JobId, stage: Stage) -> PipelineResult<Value> {
        let log = JobLogger::new(job_id, stage.as_str());

        self.load_job(job_id).await?;

        // Commit `running` before the dispatch starts
        self.jobs.mark_stage_running(job_id, stage).await?;
        log.log_start("dispatching video to stage service");

        match self.execute_video_stage(job_id, stage).await {
            Ok(payload) => {
                log.log_completion("artifact persisted");
                Ok(payload)
            }
            Err(e) => {
                let message = format!("{stage}: {e}");
                log.log_error(&message);
                if let Err(db_err) = self.jobs.mark_stage_failed(job_id, stage, &message).await {
                    warn!("Failed to record {} failure for job {}: {}", stage, job_id, db_err);
                }
                Err(e)
            }
        }
    }

    async fn execute_video_stage(&self, job_id: &JobId, stage: Stage) -> PipelineResult<Value> {
        let video_path = self.store.video_path(job_id);

        let payload = match stage {
            Stage::Extraction => self.client.dispatch_extraction(job_id, &video_path).await?,
            Stage::Transcription => {
                self.client.dispatch_transcription(job_id, &video_path).await?
            }
            Stage::Synthesis => {
                return Err(PipelineError::precondition_failed(
                    "synthesis does not take the video attachment",
                ))
            }
        };

        self.store.store_artifact(job_id, stage, &payload).await?;
        self.jobs.mark_stage_done(job_id, stage).await?;
        Ok(payload)
    }

    /// Run the synthesis stage.
    ///
    /// Precondition: extraction and transcription must both be `done`.
    /// Violations fail before the endpoint is ever called. On success the
    /// lecture is created (or updated on a re-run) and the job goes `done`.
    pub async fn run_synthesis(&self, job_id: &JobId) -> PipelineResult<Value> {
        let log = JobLogger::new(job_id, Stage::Synthesis.as_str());

        let job = self.load_job(job_id).await?;
        if !job.extraction_status.is_done() || !job.transcription_status.is_done() {
            return Err(PipelineError::precondition_failed(
                "extraction and transcription must be done before synthesis",
            ));
        }

        self.jobs.mark_stage_running(job_id, Stage::Synthesis).await?;
        log.log_start("dispatching notes synthesis");

        match self.execute_synthesis(job_id).await {
            Ok(payload) => {
                log.log_completion("lecture persisted");
                Ok(payload)
            }
            Err(e) => {
                let message = format!("{}: {}", Stage::Synthesis, e);
                log.log_error(&message);
                if let Err(db_err) = self
                    .jobs
                    .mark_stage_failed(job_id, Stage::Synthesis, &message)
                    .await
                {
                    warn!("Failed to record synthesis failure for job {}: {}", job_id, db_err);
                }
                Err(e)
            }
        }
    }

    async fn execute_synthesis(&self, job_id: &JobId) -> PipelineResult<Value> {
        let extraction = self.store.load_artifact(job_id, Stage::Extraction).await?;
        let transcript = self.store.load_artifact(job_id, Stage::Transcription).await?;

        let payload = self
            .client
            .dispatch_synthesis(job_id, &extraction, &transcript)
            .await?;

        let notes_path = self
            .store
            .store_artifact(job_id, Stage::Synthesis, &payload)
            .await?;
        let transcript_path = self.store.artifact_path(job_id, Stage::Transcription);

        let summary = payload
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let lecture = Lecture::new(
            job_id.clone(),
            summary,
            notes_path.display().to_string(),
            transcript_path.display().to_string(),
        );
        self.lectures.upsert(&lecture).await?;

        self.jobs.mark_stage_done(job_id, Stage::Synthesis).await?;
        self.jobs.complete(job_id).await?;
        Ok(payload)
    }
}
