//! Lecture processing worker.
//!
//! This crate provides:
//! - Stage runners that drive one compute stage end-to-end
//! - The pipeline orchestrator (fan-out, poll, fan-in, synthesis)
//! - A queue executor that consumes process jobs
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod orchestrator;
pub mod stages;

pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::Orchestrator;
pub use stages::StageRunner;
