//! Structured job logging utilities.

use tracing::{error, info, warn};

use lecta_models::JobId;

/// Logger that stamps pipeline lifecycle events with job and stage context.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a logger for one job and stage (or pipeline-level operation).
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Stage started: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = %self.stage, "Stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, stage = %self.stage, "Stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "Stage completed: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_keeps_job_context() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "extraction");
        assert_eq!(logger.job_id, job_id.to_string());
        assert_eq!(logger.stage, "extraction");
    }
}
