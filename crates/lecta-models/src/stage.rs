//! Pipeline stage identities and per-stage status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three compute stages a job passes through.
///
/// Extraction and transcription run against the uploaded video itself;
/// synthesis consumes their outputs and carries only JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Visual-text extraction (OCR over slide frames)
    Extraction,
    /// Audio transcription
    Transcription,
    /// Language-model synthesis of structured notes
    Synthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Transcription => "transcription",
            Stage::Synthesis => "synthesis",
        }
    }

    /// Filename of this stage's persisted artifact within a job's storage dir.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction.json",
            Stage::Transcription => "transcript.json",
            Stage::Synthesis => "notes.json",
        }
    }

    /// Whether dispatching this stage uploads the video attachment.
    ///
    /// Attachment-bearing stages are dispatched at most once per run; the
    /// video payload is too expensive to send twice.
    pub fn carries_attachment(&self) -> bool {
        matches!(self, Stage::Extraction | Stage::Transcription)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single stage within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not been dispatched yet
    #[default]
    Pending,
    /// Stage was dispatched and is in flight
    Running,
    /// Stage finished and its artifact is persisted
    Done,
    /// Stage dispatch or persistence failed
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }

    /// Parse from the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StageStatus::Pending),
            "running" => Some(StageStatus::Running),
            "done" => Some(StageStatus::Done),
            "failed" => Some(StageStatus::Failed),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StageStatus::Done)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Done | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_match_wire_form() {
        assert_eq!(Stage::Extraction.as_str(), "extraction");
        assert_eq!(Stage::Transcription.as_str(), "transcription");
        assert_eq!(Stage::Synthesis.as_str(), "synthesis");
    }

    #[test]
    fn only_video_stages_carry_attachment() {
        assert!(Stage::Extraction.carries_attachment());
        assert!(Stage::Transcription.carries_attachment());
        assert!(!Stage::Synthesis.carries_attachment());
    }

    #[test]
    fn stage_status_parse_roundtrip() {
        for status in [
            StageStatus::Pending,
            StageStatus::Running,
            StageStatus::Done,
            StageStatus::Failed,
        ] {
            assert_eq!(StageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StageStatus::parse("bogus"), None);
    }
}
