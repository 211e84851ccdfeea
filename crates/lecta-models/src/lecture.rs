//! Lecture entity: the final artifact of a successfully processed job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::job::JobId;

/// Unique identifier for a lecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct LectureId(pub String);

impl LectureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LectureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LectureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A processed lecture. Exactly one per job, created on first successful
/// synthesis; a re-run updates the existing row instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Lecture {
    pub id: LectureId,
    /// Owning job (1:1)
    pub job_id: JobId,
    /// Summary extracted from the synthesis response
    pub summary: String,
    /// Path of the final notes artifact
    pub notes_path: String,
    /// Path of the transcript artifact
    pub transcript_path: String,
}

impl Lecture {
    pub fn new(
        job_id: JobId,
        summary: impl Into<String>,
        notes_path: impl Into<String>,
        transcript_path: impl Into<String>,
    ) -> Self {
        Self {
            id: LectureId::new(),
            job_id,
            summary: summary.into(),
            notes_path: notes_path.into(),
            transcript_path: transcript_path.into(),
        }
    }
}
