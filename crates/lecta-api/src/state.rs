//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use lecta_db::{init_database, JobRepository, LectureRepository};
use lecta_queue::JobQueue;
use lecta_stage_client::StageClient;
use lecta_storage::ArtifactStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pool: SqlitePool,
    pub jobs: JobRepository,
    pub lectures: LectureRepository,
    pub storage: Arc<ArtifactStore>,
    pub queue: Arc<JobQueue>,
    pub stage_client: Arc<StageClient>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let database_path =
            PathBuf::from(std::env::var("DATABASE_PATH").unwrap_or_else(|_| "lecta.db".to_string()));
        let pool = init_database(&database_path).await?;

        let queue = JobQueue::from_env()?;
        let stage_client = StageClient::from_env()?;
        let storage = ArtifactStore::from_env();

        Ok(Self {
            config,
            jobs: JobRepository::new(pool.clone()),
            lectures: LectureRepository::new(pool.clone()),
            pool,
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            stage_client: Arc::new(stage_client),
        })
    }
}
