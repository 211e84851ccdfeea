//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lecta_models::JobId;

/// Job to run the full lecture pipeline for one uploaded video.
///
/// Enqueued by the upload handler after the video is persisted and the job
/// row exists; a worker picks it up and hands it to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessLectureJob {
    /// Job to process
    pub job_id: JobId,
    /// Owning user
    pub user_id: String,
    /// When the job was enqueued
    pub created_at: DateTime<Utc>,
}

impl ProcessLectureJob {
    pub fn new(job_id: JobId, user_id: impl Into<String>) -> Self {
        Self {
            job_id,
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("process:{}:{}", self.user_id, self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_is_stable_per_job() {
        let job_id = JobId::new();
        let a = ProcessLectureJob::new(job_id.clone(), "user-1");
        let b = ProcessLectureJob::new(job_id, "user-1");
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }

    #[test]
    fn serde_roundtrip() {
        let job = ProcessLectureJob::new(JobId::new(), "user-1");
        let json = serde_json::to_string(&job).expect("serialize job");
        let decoded: ProcessLectureJob = serde_json::from_str(&json).expect("deserialize job");
        assert_eq!(decoded.job_id, job.job_id);
        assert_eq!(decoded.user_id, job.user_id);
        assert_eq!(decoded.created_at, job.created_at);
    }
}
