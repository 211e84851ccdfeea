//! Lecture read handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use lecta_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::handlers::caller_id;
use crate::state::AppState;

/// Lecture response.
#[derive(Debug, Serialize)]
pub struct LectureResponse {
    pub id: String,
    pub job_id: String,
    pub summary: String,
    pub notes_path: String,
    pub transcript_path: String,
}

/// GET /api/lectures/:job_id
///
/// The final artifact of a processed job. 404 until synthesis has succeeded.
pub async fn get_lecture(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<LectureResponse>> {
    let user_id = caller_id(&headers)?;
    let job_id = JobId::from_string(job_id);

    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    if job.user_id != user_id {
        return Err(ApiError::forbidden("Access denied"));
    }

    let lecture = state
        .lectures
        .get_by_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lecture not ready"))?;

    Ok(Json(LectureResponse {
        id: lecture.id.to_string(),
        job_id: lecture.job_id.to_string(),
        summary: lecture.summary,
        notes_path: lecture.notes_path,
        transcript_path: lecture.transcript_path,
    }))
}
