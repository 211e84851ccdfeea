//! Typed repository for Job entities.
//!
//! Status writes are guarded in SQL so the terminal-sink invariants hold even
//! when two workers or an external cancel race on the same row: `done`,
//! `failed` and `cancelled` overall statuses are never overwritten, and
//! failure cleanup never reverts a stage that already reached `done`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use lecta_models::{Job, JobId, JobStatus, Stage, StageStatus};

use crate::error::{DbError, DbResult};

/// Repository for job rows.
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

const JOB_COLUMNS: &str = "id, user_id, video_path, extraction_status, transcription_status, \
     synthesis_status, overall_status, status_message, active_run_id, created_at, updated_at";

impl JobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Column holding one stage's status.
    fn stage_column(stage: Stage) -> &'static str {
        match stage {
            Stage::Extraction => "extraction_status",
            Stage::Transcription => "transcription_status",
            Stage::Synthesis => "synthesis_status",
        }
    }

    /// Insert a new job row.
    pub async fn create(&self, job: &Job) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, user_id, video_path, extraction_status, transcription_status,
                              synthesis_status, overall_status, status_message, active_run_id,
                              created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(job.id.as_str())
        .bind(&job.user_id)
        .bind(&job.video_path)
        .bind(job.extraction_status.as_str())
        .bind(job.transcription_status.as_str())
        .bind(job.synthesis_status.as_str())
        .bind(job.overall_status.as_str())
        .bind(job.status_message.as_deref())
        .bind(job.active_run_id.as_deref())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        info!("Created job record: {}", job.id);
        Ok(())
    }

    /// Get a job by ID.
    pub async fn get(&self, job_id: &JobId) -> DbResult<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))
            .bind(job_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_job(&r)).transpose()
    }

    /// Get a job by ID, failing if it does not exist.
    pub async fn fetch(&self, job_id: &JobId) -> DbResult<Job> {
        self.get(job_id)
            .await?
            .ok_or_else(|| DbError::not_found(format!("job {job_id}")))
    }

    /// List a user's jobs, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_job).collect()
    }

    /// Record where the uploaded video was persisted.
    pub async fn set_video_path(&self, job_id: &JobId, video_path: &str) -> DbResult<()> {
        sqlx::query("UPDATE jobs SET video_path = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(job_id.as_str())
            .bind(video_path)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip one stage to `running`. Committed before the stage is dispatched
    /// so concurrent readers observe the in-flight state.
    pub async fn mark_stage_running(&self, job_id: &JobId, stage: Stage) -> DbResult<()> {
        let sql = format!(
            "UPDATE jobs SET {} = 'running', updated_at = ?2 WHERE id = ?1",
            Self::stage_column(stage)
        );
        sqlx::query(&sql)
            .bind(job_id.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip one stage to `done` and clear the stage failure message.
    pub async fn mark_stage_done(&self, job_id: &JobId, stage: Stage) -> DbResult<()> {
        let sql = format!(
            "UPDATE jobs SET {} = 'done', status_message = NULL, updated_at = ?2 WHERE id = ?1",
            Self::stage_column(stage)
        );
        sqlx::query(&sql)
            .bind(job_id.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flip one stage to `failed` with a stage-prefixed message.
    pub async fn mark_stage_failed(
        &self,
        job_id: &JobId,
        stage: Stage,
        message: &str,
    ) -> DbResult<()> {
        let sql = format!(
            "UPDATE jobs SET {} = 'failed', status_message = ?2, updated_at = ?3 WHERE id = ?1",
            Self::stage_column(stage)
        );
        sqlx::query(&sql)
            .bind(job_id.as_str())
            .bind(message)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Move the overall status from `pending` to `running`. No-op once the
    /// job is terminal.
    pub async fn mark_running(&self, job_id: &JobId) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET overall_status = 'running', updated_at = ?2 \
             WHERE id = ?1 AND overall_status NOT IN ('done', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark the whole job `done` and clear the failure message. No-op once
    /// the job is terminal (a racing cancel wins).
    pub async fn complete(&self, job_id: &JobId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET overall_status = 'done', status_message = NULL, updated_at = ?2 \
             WHERE id = ?1 AND overall_status NOT IN ('done', 'failed', 'cancelled')",
        )
        .bind(job_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Top-level failure aggregation, in one atomic statement:
    /// - overall status becomes `failed` unless the job is already terminal
    /// - the first-seen message is preserved, `message` only fills a blank
    /// - stages still `pending`/`running` are force-flipped to `failed`;
    ///   stages already `done` keep their status
    pub async fn mark_failed(&self, job_id: &JobId, message: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                overall_status = 'failed',
                status_message = COALESCE(status_message, ?2),
                extraction_status = CASE WHEN extraction_status IN ('pending', 'running')
                                         THEN 'failed' ELSE extraction_status END,
                transcription_status = CASE WHEN transcription_status IN ('pending', 'running')
                                            THEN 'failed' ELSE transcription_status END,
                synthesis_status = CASE WHEN synthesis_status IN ('pending', 'running')
                                        THEN 'failed' ELSE synthesis_status END,
                updated_at = ?3
            WHERE id = ?1 AND overall_status NOT IN ('done', 'failed', 'cancelled')
            "#,
        )
        .bind(job_id.as_str())
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Cancel the job. Succeeds only while the job is still `pending` or
    /// `running`; returns false once it is terminal.
    pub async fn cancel(&self, job_id: &JobId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET overall_status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND overall_status IN ('pending', 'running')",
        )
        .bind(job_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Compare-and-set the run lease. Returns true if this run now owns the
    /// job; false if another run already holds it.
    pub async fn acquire_run_lease(&self, job_id: &JobId, run_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET active_run_id = ?2, updated_at = ?3 \
             WHERE id = ?1 AND active_run_id IS NULL",
        )
        .bind(job_id.as_str())
        .bind(run_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Release the run lease, but only if this run still holds it.
    pub async fn release_run_lease(&self, job_id: &JobId, run_id: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs SET active_run_id = NULL, updated_at = ?3 \
             WHERE id = ?1 AND active_run_id = ?2",
        )
        .bind(job_id.as_str())
        .bind(run_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_job(row: &SqliteRow) -> DbResult<Job> {
    let stage = |col: &str| -> DbResult<StageStatus> {
        let raw: String = row.try_get(col)?;
        StageStatus::parse(&raw)
            .ok_or_else(|| DbError::decode(format!("stage status {raw:?} in column {col}")))
    };

    let overall_raw: String = row.try_get("overall_status")?;
    let overall_status = JobStatus::parse(&overall_raw)
        .ok_or_else(|| DbError::decode(format!("overall status {overall_raw:?}")))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Job {
        id: JobId::from_string(row.try_get::<String, _>("id")?),
        user_id: row.try_get("user_id")?,
        video_path: row.try_get("video_path")?,
        extraction_status: stage("extraction_status")?,
        transcription_status: stage("transcription_status")?,
        synthesis_status: stage("synthesis_status")?,
        overall_status,
        status_message: row.try_get("status_message")?,
        active_run_id: row.try_get("active_run_id")?,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::init_database;
    use tempfile::TempDir;

    async fn test_repo() -> (JobRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();
        (JobRepository::new(pool), dir)
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.overall_status, JobStatus::Pending);
        assert_eq!(loaded.extraction_status, StageStatus::Pending);
        assert!(loaded.status_message.is_none());
    }

    #[tokio::test]
    async fn get_missing_job_is_none() {
        let (repo, _dir) = test_repo().await;
        assert!(repo.get(&JobId::new()).await.unwrap().is_none());
        assert!(matches!(
            repo.fetch(&JobId::new()).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stage_updates_only_touch_their_column() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        repo.mark_stage_running(&job.id, Stage::Extraction).await.unwrap();
        repo.mark_stage_done(&job.id, Stage::Transcription).await.unwrap();

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.extraction_status, StageStatus::Running);
        assert_eq!(loaded.transcription_status, StageStatus::Done);
        assert_eq!(loaded.synthesis_status, StageStatus::Pending);
    }

    #[tokio::test]
    async fn stage_done_clears_message() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        repo.mark_stage_failed(&job.id, Stage::Extraction, "extraction: boom")
            .await
            .unwrap();
        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.status_message.as_deref(), Some("extraction: boom"));

        repo.mark_stage_done(&job.id, Stage::Extraction).await.unwrap();
        let loaded = repo.fetch(&job.id).await.unwrap();
        assert!(loaded.status_message.is_none());
    }

    #[tokio::test]
    async fn mark_failed_forces_only_unfinished_stages() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        repo.mark_stage_done(&job.id, Stage::Transcription).await.unwrap();
        repo.mark_stage_running(&job.id, Stage::Extraction).await.unwrap();

        assert!(repo.mark_failed(&job.id, "pipeline blew up").await.unwrap());

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.overall_status, JobStatus::Failed);
        assert_eq!(loaded.extraction_status, StageStatus::Failed);
        assert_eq!(loaded.transcription_status, StageStatus::Done);
        assert_eq!(loaded.synthesis_status, StageStatus::Failed);
        assert_eq!(loaded.status_message.as_deref(), Some("pipeline blew up"));
    }

    #[tokio::test]
    async fn mark_failed_preserves_first_message() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        repo.mark_stage_failed(&job.id, Stage::Extraction, "extraction: timeout")
            .await
            .unwrap();
        repo.mark_failed(&job.id, "pipeline failure").await.unwrap();

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.status_message.as_deref(), Some("extraction: timeout"));
    }

    #[tokio::test]
    async fn terminal_statuses_are_sinks() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        assert!(repo.cancel(&job.id).await.unwrap());

        // Neither failure aggregation nor completion may overwrite cancelled
        assert!(!repo.mark_failed(&job.id, "late failure").await.unwrap());
        assert!(!repo.complete(&job.id).await.unwrap());
        assert!(!repo.cancel(&job.id).await.unwrap());

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.overall_status, JobStatus::Cancelled);
        assert!(loaded.status_message.is_none());
    }

    #[tokio::test]
    async fn done_is_a_sink_too() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        assert!(repo.complete(&job.id).await.unwrap());
        assert!(!repo.mark_failed(&job.id, "late failure").await.unwrap());
        assert!(!repo.cancel(&job.id).await.unwrap());

        let loaded = repo.fetch(&job.id).await.unwrap();
        assert_eq!(loaded.overall_status, JobStatus::Done);
    }

    #[tokio::test]
    async fn run_lease_is_exclusive() {
        let (repo, _dir) = test_repo().await;
        let job = Job::new("user-1");
        repo.create(&job).await.unwrap();

        assert!(repo.acquire_run_lease(&job.id, "run-a").await.unwrap());
        assert!(!repo.acquire_run_lease(&job.id, "run-b").await.unwrap());

        // A release by the wrong run must not free the lease
        repo.release_run_lease(&job.id, "run-b").await.unwrap();
        assert!(!repo.acquire_run_lease(&job.id, "run-b").await.unwrap());

        repo.release_run_lease(&job.id, "run-a").await.unwrap();
        assert!(repo.acquire_run_lease(&job.id, "run-b").await.unwrap());
    }

    #[tokio::test]
    async fn list_for_user_filters_by_owner() {
        let (repo, _dir) = test_repo().await;
        let mine = Job::new("user-1");
        let theirs = Job::new("user-2");
        repo.create(&mine).await.unwrap();
        repo.create(&theirs).await.unwrap();

        let jobs = repo.list_for_user("user-1").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, mine.id);
    }
}
