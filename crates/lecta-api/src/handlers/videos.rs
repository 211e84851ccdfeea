//! Video upload handler: the pipeline trigger boundary.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::info;

use lecta_models::Job;
use lecta_queue::ProcessLectureJob;

use crate::error::{ApiError, ApiResult};
use crate::handlers::caller_id;
use crate::metrics::record_job_enqueued;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub overall_status: String,
}

/// POST /api/videos
///
/// Accept a lecture video upload, create the job row, persist the video in
/// the job's storage dir and enqueue processing. The handler only enqueues;
/// the pipeline runs on a worker, so the response returns immediately with
/// the job id for polling.
pub async fn upload_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let user_id = caller_id(&headers)?;

    let mut video_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|f| f.to_string())
            .ok_or_else(|| ApiError::bad_request("No file selected"))?;

        if !allowed_file(&filename) {
            return Err(ApiError::bad_request(
                "Invalid file type. Allowed: mp4, avi, mov, mkv, webm",
            ));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        video_bytes = Some(bytes.to_vec());
    }

    let video_bytes =
        video_bytes.ok_or_else(|| ApiError::bad_request("No video file provided"))?;

    // Create the job first so the storage dir can be keyed by its id
    let job = Job::new(&user_id);
    state.jobs.create(&job).await?;

    let video_path = state.storage.save_video(&job.id, &video_bytes).await?;
    state
        .jobs
        .set_video_path(&job.id, &video_path.display().to_string())
        .await?;

    state
        .queue
        .enqueue_process(ProcessLectureJob::new(job.id.clone(), &user_id))
        .await?;
    record_job_enqueued();

    info!("Accepted upload for job {} ({} bytes)", job.id, video_bytes.len());

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            job_id: job.id.to_string(),
            overall_status: job.overall_status.as_str().to_string(),
        }),
    ))
}

/// Check the upload's file extension against the allow-list.
fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_extensions() {
        assert!(allowed_file("lecture.mp4"));
        assert!(allowed_file("lecture.MKV"));
        assert!(allowed_file("week 3.recording.webm"));
    }

    #[test]
    fn rejected_extensions() {
        assert!(!allowed_file("lecture.exe"));
        assert!(!allowed_file("lecture"));
        assert!(!allowed_file("mp4"));
    }
}
