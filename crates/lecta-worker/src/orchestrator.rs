//! Pipeline orchestrator.
//!
//! Sequences the three stage runners for one job: extraction and
//! transcription fan out onto their own tasks, the poll loop waits for both
//! to reach a terminal status in the store, then synthesis runs strictly
//! after. Cancellation is cooperative: it is observed before fan-out, on
//! every poll iteration, and before synthesis. An in-flight stage dispatch
//! always completes or times out on its own.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use lecta_db::JobRepository;
use lecta_models::{Job, JobId, StageStatus};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::stages::StageRunner;

/// Drives one job through the full pipeline.
pub struct Orchestrator {
    jobs: JobRepository,
    runner: StageRunner,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl Orchestrator {
    pub fn new(jobs: JobRepository, runner: StageRunner, config: &WorkerConfig) -> Self {
        Self {
            jobs,
            runner,
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Process a job through all stages.
    ///
    /// Returns `Ok(true)` when the pipeline ran to completion, `Ok(false)`
    /// when cancellation was observed at a checkpoint (or another run already
    /// holds the job's lease), and `Err` on failure, in which case the job's
    /// overall status has been aggregated to `failed` unless it was already
    /// cancelled. Callers log the error; they must not retry, or the video
    /// attachment would be uploaded and billed again.
    pub async fn process(&self, job_id: &JobId) -> PipelineResult<bool> {
        let job = self.load_job(job_id).await?;

        // A cancelled job is never started; nothing is dispatched
        if job.is_cancelled() {
            info!("Job {} is cancelled; not starting", job_id);
            return Ok(false);
        }

        // Single-writer-per-job: compare-and-set the run lease
        let run_id = Uuid::new_v4().to_string();
        if !self.jobs.acquire_run_lease(job_id, &run_id).await? {
            warn!("Job {} already has an active run; skipping", job_id);
            return Ok(false);
        }

        let result = self.run_pipeline(job_id).await;

        // Aggregate the failure while the lease is still held, then release
        if let Err(e) = &result {
            self.record_failure(job_id, e).await;
        }
        if let Err(e) = self.jobs.release_run_lease(job_id, &run_id).await {
            warn!("Failed to release run lease for job {}: {}", job_id, e);
        }

        result
    }

    async fn run_pipeline(&self, job_id: &JobId) -> PipelineResult<bool> {
        self.jobs.mark_running(job_id).await?;

        // Fan-out: extraction and transcription run concurrently. Each task
        // gets its own runner clone, so every read-modify-commit cycle goes
        // through its own pooled connection and the two writers never share
        // in-process state.
        let extraction_task = {
            let runner = self.runner.clone();
            let id = job_id.clone();
            tokio::spawn(async move { runner.run_extraction(&id).await })
        };
        let transcription_task = {
            let runner = self.runner.clone();
            let id = job_id.clone();
            tokio::spawn(async move { runner.run_transcription(&id).await })
        };

        // Hard synchronization point: both dispatches are allowed to finish
        // even if one has already failed. There is no cross-cancellation.
        let (extraction_res, transcription_res) =
            tokio::join!(extraction_task, transcription_task);

        let extraction_res = extraction_res
            .map_err(|e| PipelineError::stage_failed(format!("extraction task panicked: {e}")))?;
        let transcription_res = transcription_res.map_err(|e| {
            PipelineError::stage_failed(format!("transcription task panicked: {e}"))
        })?;

        // First-seen error wins; the other outcome is already persisted
        extraction_res?;
        transcription_res?;

        // Poll the persisted statuses until both are terminal; cancellation
        // is observed on every iteration
        if !self.wait_for_stage_completion(job_id).await? {
            return Ok(false);
        }

        // Last cancellation check before the synthesis dispatch
        let job = self.load_job(job_id).await?;
        if job.is_cancelled() {
            info!("Job {} cancelled before synthesis", job_id);
            return Ok(false);
        }

        self.runner.run_synthesis(job_id).await?;
        Ok(true)
    }

    /// Poll loop over the persisted job row. The fan-out results are not
    /// trusted directly: completion is what the store says it is.
    ///
    /// Returns `Ok(true)` once both stages are `done`, `Ok(false)` if the
    /// job was cancelled while waiting. Raises on a failed stage or when the
    /// attempt budget runs out.
    pub async fn wait_for_stage_completion(&self, job_id: &JobId) -> PipelineResult<bool> {
        let mut attempts = 0u32;
        loop {
            let job = self.load_job(job_id).await?;

            if job.is_cancelled() {
                info!("Job {} cancelled while waiting for stages", job_id);
                return Ok(false);
            }
            if job.extraction_status.is_done() && job.transcription_status.is_done() {
                return Ok(true);
            }
            if job.extraction_status == StageStatus::Failed
                || job.transcription_status == StageStatus::Failed
            {
                return Err(PipelineError::stage_failed(
                    "extraction or transcription failed",
                ));
            }
            if attempts >= self.max_poll_attempts {
                return Err(PipelineError::timeout(
                    "gave up waiting for extraction and transcription to finish",
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
            attempts += 1;
        }
    }

    async fn load_job(&self, job_id: &JobId) -> PipelineResult<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {job_id}")))
    }

    /// Top-level failure aggregation. The guarded update leaves cancelled
    /// (and already-terminal) jobs untouched, keeps the first-seen message,
    /// and force-flips stages still pending/running to `failed`.
    async fn record_failure(&self, job_id: &JobId, error: &PipelineError) {
        match self.jobs.mark_failed(job_id, &error.to_string()).await {
            Ok(true) => info!("Job {} marked failed: {}", job_id, error),
            Ok(false) => debug!("Job {} already terminal; keeping its status", job_id),
            Err(db_err) => warn!("Failed to record failure for job {}: {}", job_id, db_err),
        }
    }
}
