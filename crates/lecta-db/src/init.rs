//! Database initialization.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Initialize the database connection pool and create tables if needed.
pub async fn init_database(db_path: &Path) -> DbResult<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while the fan-out workers write
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Serialize contended writes instead of failing immediately
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_jobs_table(&pool).await?;
    create_lectures_table(&pool).await?;

    Ok(pool)
}

async fn create_jobs_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            video_path TEXT NOT NULL DEFAULT '',
            extraction_status TEXT NOT NULL DEFAULT 'pending',
            transcription_status TEXT NOT NULL DEFAULT 'pending',
            synthesis_status TEXT NOT NULL DEFAULT 'pending',
            overall_status TEXT NOT NULL DEFAULT 'pending',
            status_message TEXT,
            active_run_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_user_id ON jobs(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_lectures_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lectures (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL UNIQUE REFERENCES jobs(id),
            summary TEXT NOT NULL DEFAULT '',
            notes_path TEXT NOT NULL DEFAULT '',
            transcript_path TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
