//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Job or lecture missing from the store; fails fast, never retried.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Synthesis was invoked before its prerequisites were done. The
    /// endpoint is never called in this case.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Extraction or transcription reported failure.
    #[error("Stage failed: {0}")]
    StageFailed(String),

    /// The poll loop exhausted its attempt budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Stage(#[from] lecta_stage_client::StageClientError),

    #[error("Store error: {0}")]
    Db(#[from] lecta_db::DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] lecta_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] lecta_queue::QueueError),
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn stage_failed(msg: impl Into<String>) -> Self {
        Self::StageFailed(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
