//! Job status and cancellation handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::info;

use lecta_models::{Job, JobId, JobStatusView};

use crate::error::{ApiError, ApiResult};
use crate::handlers::caller_id;
use crate::metrics::record_job_cancelled;
use crate::state::AppState;

/// Load a job and verify the caller owns it.
async fn load_owned_job(state: &AppState, headers: &HeaderMap, job_id: &str) -> ApiResult<Job> {
    let user_id = caller_id(headers)?;
    let job = state
        .jobs
        .get(&JobId::from_string(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if job.user_id != user_id {
        return Err(ApiError::forbidden("Access denied"));
    }
    Ok(job)
}

/// GET /api/jobs
///
/// List the caller's jobs as status projections, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<JobStatusView>>> {
    let user_id = caller_id(&headers)?;
    let jobs = state.jobs.list_for_user(&user_id).await?;
    Ok(Json(jobs.iter().map(Job::status_view).collect()))
}

/// GET /api/jobs/:job_id/status
///
/// The read-only status surface for pollers: three stage statuses, the
/// overall status, the failure message and timestamps.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<JobStatusView>> {
    let job = load_owned_job(&state, &headers, &job_id).await?;
    Ok(Json(job.status_view()))
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub overall_status: String,
}

/// POST /api/jobs/:job_id/cancel
///
/// Flip the job to `cancelled`. Only pending/running jobs can be cancelled;
/// the pipeline observes the flag at its next checkpoint. An in-flight stage
/// dispatch is not interrupted.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<CancelResponse>> {
    let job = load_owned_job(&state, &headers, &job_id).await?;

    if !state.jobs.cancel(&job.id).await? {
        return Err(ApiError::conflict(format!(
            "Job is already {}",
            job.overall_status
        )));
    }
    record_job_cancelled();

    info!("Cancelled job {}", job.id);

    Ok(Json(CancelResponse {
        job_id: job.id.to_string(),
        overall_status: "cancelled".to_string(),
    }))
}
