//! Job entity: one uploaded lecture video and its pipeline state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::stage::{Stage, StageStatus};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall status of a job across all stages.
///
/// `Done`, `Failed` and `Cancelled` are terminal sinks: once a job reaches
/// one of them the pipeline never writes another overall status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for a worker
    #[default]
    Pending,
    /// The pipeline is driving the job through its stages
    Running,
    /// All three stages completed and the lecture was persisted
    Done,
    /// A stage or the pipeline itself failed
    Failed,
    /// An external actor cancelled the job
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no more pipeline writes).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lecture-processing job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Owning user
    pub user_id: String,

    /// Path of the uploaded video within the job's storage dir
    /// (empty until the upload is persisted)
    pub video_path: String,

    /// Visual-text extraction stage status
    pub extraction_status: StageStatus,

    /// Audio transcription stage status
    pub transcription_status: StageStatus,

    /// Notes synthesis stage status
    pub synthesis_status: StageStatus,

    /// Overall status across all stages
    pub overall_status: JobStatus,

    /// Short, stage-prefixed human-readable failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// Run lease: set while an orchestrator run owns this job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_run_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job with every stage pending.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            user_id: user_id.into(),
            video_path: String::new(),
            extraction_status: StageStatus::Pending,
            transcription_status: StageStatus::Pending,
            synthesis_status: StageStatus::Pending,
            overall_status: JobStatus::Pending,
            status_message: None,
            active_run_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status of one stage.
    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Extraction => self.extraction_status,
            Stage::Transcription => self.transcription_status,
            Stage::Synthesis => self.synthesis_status,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.overall_status == JobStatus::Done
    }

    pub fn has_failed(&self) -> bool {
        self.overall_status == JobStatus::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        self.overall_status == JobStatus::Cancelled
    }

    /// True while any stage is still pending or running.
    pub fn is_processing(&self) -> bool {
        !self.extraction_status.is_terminal()
            || !self.transcription_status.is_terminal()
            || !self.synthesis_status.is_terminal()
    }

    /// A job can only be cancelled before it reaches a terminal status.
    pub fn can_cancel(&self) -> bool {
        !self.overall_status.is_terminal()
    }

    /// Read-only projection served to external pollers.
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id.clone(),
            extraction_status: self.extraction_status,
            transcription_status: self.transcription_status,
            synthesis_status: self.synthesis_status,
            overall_status: self.overall_status,
            status_message: self.status_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only status projection of a job.
///
/// This is the polling surface: three stage statuses, the overall status,
/// the failure message (if any) and timestamps. Nothing else leaks out.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub extraction_status: StageStatus,
    pub transcription_status: StageStatus,
    pub synthesis_status: StageStatus,
    pub overall_status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending() {
        let job = Job::new("user123");
        assert_eq!(job.overall_status, JobStatus::Pending);
        assert_eq!(job.extraction_status, StageStatus::Pending);
        assert_eq!(job.transcription_status, StageStatus::Pending);
        assert_eq!(job.synthesis_status, StageStatus::Pending);
        assert!(job.is_processing());
        assert!(job.can_cancel());
    }

    #[test]
    fn terminal_statuses_cannot_cancel() {
        let mut job = Job::new("user123");
        for status in [JobStatus::Done, JobStatus::Failed, JobStatus::Cancelled] {
            job.overall_status = status;
            assert!(!job.can_cancel(), "{status} should not be cancellable");
        }
        job.overall_status = JobStatus::Running;
        assert!(job.can_cancel());
    }

    #[test]
    fn status_view_serializes_snake_case_statuses() {
        let mut job = Job::new("user123");
        job.extraction_status = StageStatus::Done;
        job.overall_status = JobStatus::Running;

        let json = serde_json::to_value(job.status_view()).unwrap();
        assert_eq!(json["extraction_status"], "done");
        assert_eq!(json["overall_status"], "running");
        assert!(json.get("status_message").is_none());
    }
}
