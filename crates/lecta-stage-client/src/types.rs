//! Wire types for the stage services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health endpoint response.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Payload for the synthesis endpoint: the job id plus the outputs of the
/// two prerequisite stages.
#[derive(Debug, Serialize)]
pub struct SynthesisRequest<'a> {
    pub job_id: &'a str,
    pub extraction: &'a Value,
    pub transcript: &'a Value,
}
