//! Shared data models for the Lecta backend.
//!
//! This crate provides Serde-serializable types for:
//! - Processing jobs and their per-stage statuses
//! - Pipeline stages (extraction, transcription, synthesis)
//! - Lectures (the final artifact of a processed job)
//! - The read-only status projection served to pollers

pub mod job;
pub mod lecture;
pub mod stage;

// Re-export common types
pub use job::{Job, JobId, JobStatus, JobStatusView};
pub use lecture::{Lecture, LectureId};
pub use stage::{Stage, StageStatus};
