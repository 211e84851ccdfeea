//! Redis Streams job queue.
//!
//! This crate provides:
//! - Fire-and-forget job enqueueing from the upload boundary
//! - Worker consumption through a consumer group
//! - A dead-letter stream for failed runs (no automatic redelivery)

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::ProcessLectureJob;
pub use queue::{JobQueue, QueueConfig};
