//! Local filesystem artifact store.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use lecta_models::{JobId, Stage};

use crate::error::{StorageError, StorageResult};

/// Filename of the uploaded video within a job's storage dir.
pub const VIDEO_FILENAME: &str = "video.mp4";

/// Artifact store rooted at a configurable upload directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the `STORAGE_DIR` environment variable.
    pub fn from_env() -> Self {
        let root = std::env::var("STORAGE_DIR").unwrap_or_else(|_| "storage".to_string());
        Self::new(root)
    }

    /// Storage directory for one job.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(format!("job_{job_id}"))
    }

    /// Create the job's storage directory if it does not exist yet.
    pub async fn ensure_job_dir(&self, job_id: &JobId) -> StorageResult<PathBuf> {
        let dir = self.job_dir(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Path of the uploaded video for a job.
    pub fn video_path(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(VIDEO_FILENAME)
    }

    /// Persist the uploaded video bytes and return their path.
    pub async fn save_video(&self, job_id: &JobId, bytes: &[u8]) -> StorageResult<PathBuf> {
        self.ensure_job_dir(job_id).await?;
        let path = self.video_path(job_id);
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved video for job {} ({} bytes)", job_id, bytes.len());
        Ok(path)
    }

    /// Path of one stage's artifact for a job.
    pub fn artifact_path(&self, job_id: &JobId, stage: Stage) -> PathBuf {
        self.job_dir(job_id).join(stage.artifact_name())
    }

    /// Persist a stage's JSON output as a durable artifact.
    pub async fn store_artifact(
        &self,
        job_id: &JobId,
        stage: Stage,
        payload: &Value,
    ) -> StorageResult<PathBuf> {
        self.ensure_job_dir(job_id).await?;
        let path = self.artifact_path(job_id, stage);
        let json = serde_json::to_vec_pretty(payload)?;
        tokio::fs::write(&path, json).await?;
        debug!("Stored {} artifact for job {}", stage, job_id);
        Ok(path)
    }

    /// Load a previously persisted stage artifact.
    pub async fn load_artifact(&self, job_id: &JobId, stage: Stage) -> StorageResult<Value> {
        let path = self.artifact_path(job_id, stage);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(path.display().to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Check whether a stage artifact exists.
    pub async fn artifact_exists(&self, job_id: &JobId, stage: Stage) -> bool {
        tokio::fs::try_exists(self.artifact_path(job_id, stage))
            .await
            .unwrap_or(false)
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (ArtifactStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (ArtifactStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn store_and_load_artifact() {
        let (store, _dir) = test_store();
        let job_id = JobId::new();
        let payload = json!({"text_blocks": ["intro slide"], "frames": 42});

        let path = store
            .store_artifact(&job_id, Stage::Extraction, &payload)
            .await
            .unwrap();
        assert!(path.ends_with("extraction.json"));
        assert!(store.artifact_exists(&job_id, Stage::Extraction).await);

        let loaded = store.load_artifact(&job_id, Stage::Extraction).await.unwrap();
        assert_eq!(loaded, payload);
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let (store, _dir) = test_store();
        let job_id = JobId::new();

        assert!(!store.artifact_exists(&job_id, Stage::Synthesis).await);
        let err = store.load_artifact(&job_id, Stage::Synthesis).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn video_lives_inside_job_dir() {
        let (store, _dir) = test_store();
        let job_id = JobId::new();

        let path = store.save_video(&job_id, b"not really mp4").await.unwrap();
        assert_eq!(path, store.video_path(&job_id));
        assert!(path.starts_with(store.job_dir(&job_id)));

        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes, b"not really mp4");
    }

    #[tokio::test]
    async fn artifacts_are_keyed_by_stage() {
        let (store, _dir) = test_store();
        let job_id = JobId::new();

        store
            .store_artifact(&job_id, Stage::Extraction, &json!({"kind": "ocr"}))
            .await
            .unwrap();
        store
            .store_artifact(&job_id, Stage::Transcription, &json!({"kind": "asr"}))
            .await
            .unwrap();

        let ocr = store.load_artifact(&job_id, Stage::Extraction).await.unwrap();
        let asr = store.load_artifact(&job_id, Stage::Transcription).await.unwrap();
        assert_eq!(ocr["kind"], "ocr");
        assert_eq!(asr["kind"], "asr");
    }
}
