//! Typed repository for Lecture entities.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use lecta_models::{JobId, Lecture, LectureId};

use crate::error::DbResult;

/// Repository for lecture rows.
#[derive(Clone)]
pub struct LectureRepository {
    pool: SqlitePool,
}

impl LectureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the lecture for a job, or update it if synthesis re-ran.
    /// The `job_id` UNIQUE constraint keeps the relationship 1:1.
    pub async fn upsert(&self, lecture: &Lecture) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lectures (id, job_id, summary, notes_path, transcript_path)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(job_id) DO UPDATE SET
                summary = excluded.summary,
                notes_path = excluded.notes_path,
                transcript_path = excluded.transcript_path
            "#,
        )
        .bind(lecture.id.as_str())
        .bind(lecture.job_id.as_str())
        .bind(&lecture.summary)
        .bind(&lecture.notes_path)
        .bind(&lecture.transcript_path)
        .execute(&self.pool)
        .await?;

        info!("Stored lecture for job {}", lecture.job_id);
        Ok(())
    }

    /// Get the lecture belonging to a job.
    pub async fn get_by_job(&self, job_id: &JobId) -> DbResult<Option<Lecture>> {
        let row = sqlx::query(
            "SELECT id, job_id, summary, notes_path, transcript_path \
             FROM lectures WHERE job_id = ?1",
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_lecture(&r)).transpose()
    }
}

fn row_to_lecture(row: &SqliteRow) -> DbResult<Lecture> {
    Ok(Lecture {
        id: LectureId::from_string(row.try_get::<String, _>("id")?),
        job_id: JobId::from_string(row.try_get::<String, _>("job_id")?),
        summary: row.try_get("summary")?,
        notes_path: row.try_get("notes_path")?,
        transcript_path: row.try_get("transcript_path")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::init_database;
    use crate::jobs::JobRepository;
    use lecta_models::Job;
    use tempfile::TempDir;

    async fn test_repos() -> (JobRepository, LectureRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();
        (
            JobRepository::new(pool.clone()),
            LectureRepository::new(pool),
            dir,
        )
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_single_row() {
        let (jobs, lectures, _dir) = test_repos().await;
        let job = Job::new("user-1");
        jobs.create(&job).await.unwrap();

        let first = Lecture::new(job.id.clone(), "v1 summary", "a/notes.json", "a/transcript.json");
        lectures.upsert(&first).await.unwrap();

        // Re-running synthesis updates in place rather than duplicating
        let second = Lecture::new(job.id.clone(), "v2 summary", "b/notes.json", "b/transcript.json");
        lectures.upsert(&second).await.unwrap();

        let loaded = lectures.get_by_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.summary, "v2 summary");
        assert_eq!(loaded.notes_path, "b/notes.json");
        // The original row id survives the upsert
        assert_eq!(loaded.id, first.id);
    }

    #[tokio::test]
    async fn get_by_job_missing_is_none() {
        let (_jobs, lectures, _dir) = test_repos().await;
        assert!(lectures.get_by_job(&JobId::new()).await.unwrap().is_none());
    }
}
