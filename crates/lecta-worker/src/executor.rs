//! Job executor: consumes process jobs from the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use lecta_queue::{JobQueue, ProcessLectureJob};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::orchestrator::Orchestrator;

/// Consumes jobs from the queue and hands them to the orchestrator.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    orchestrator: Arc<Orchestrator>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: Arc<JobQueue>, orchestrator: Arc<Orchestrator>) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue,
            orchestrator,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> PipelineResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process jobs from the queue.
    async fn consume_jobs(&self) -> PipelineResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let orchestrator = Arc::clone(&self.orchestrator);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::stage_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(orchestrator, queue, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single job. Failed runs go straight to the DLQ; redelivery
    /// would dispatch the attachment-bearing stages a second time.
    async fn execute_job(
        orchestrator: Arc<Orchestrator>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: ProcessLectureJob,
    ) {
        let job_id = job.job_id.clone();
        info!("Executing job {}", job_id);

        match orchestrator.process(&job_id).await {
            Ok(true) => {
                info!("Job {} completed successfully", job_id);
                if let Err(e) = queue.ack(&message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
            }
            Ok(false) => {
                info!("Job {} did not run (cancelled or already active)", job_id);
                if let Err(e) = queue.ack(&message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                if let Err(dlq_err) = queue.dlq(&message_id, &job, &e.to_string()).await {
                    error!("Failed to move job {} to DLQ: {}", job_id, dlq_err);
                }
            }
        }

        // Clear dedup so the user can submit the job again later
        if let Err(e) = queue.clear_dedup(&job).await {
            error!("Failed to clear dedup key for job {}: {}", job_id, e);
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
