//! Stage service HTTP client.

use std::error::Error as _;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use lecta_models::{JobId, Stage};

use crate::error::{StageClientError, StageClientResult};
use crate::types::{HealthResponse, SynthesisRequest};

fn strip_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Configuration for the stage client.
#[derive(Debug, Clone)]
pub struct StageClientConfig {
    /// Base URL of the visual-text extraction service
    pub extraction_url: String,
    /// Base URL of the transcription service
    pub transcription_url: String,
    /// Base URL of the synthesis service
    pub synthesis_url: String,
    /// Request deadline (covers the full upload + processing round trip)
    pub timeout: Duration,
    /// Max retries for the synthesis dispatch (JSON-only, cheap to resend)
    pub synthesis_max_retries: u32,
}

impl Default for StageClientConfig {
    fn default() -> Self {
        Self {
            extraction_url: "http://localhost:5001".to_string(),
            transcription_url: "http://localhost:5002".to_string(),
            synthesis_url: "http://localhost:5003".to_string(),
            timeout: Duration::from_secs(300),
            synthesis_max_retries: 2,
        }
    }
}

impl StageClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            extraction_url: strip_trailing_slash(
                std::env::var("EXTRACTION_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:5001".to_string()),
            ),
            transcription_url: strip_trailing_slash(
                std::env::var("TRANSCRIPTION_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:5002".to_string()),
            ),
            synthesis_url: strip_trailing_slash(
                std::env::var("SYNTHESIS_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:5003".to_string()),
            ),
            timeout: Duration::from_secs(
                std::env::var("SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            synthesis_max_retries: std::env::var("SYNTHESIS_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Client for the extraction, transcription and synthesis services.
pub struct StageClient {
    http: Client,
    config: StageClientConfig,
}

impl StageClient {
    /// Create a new stage client.
    pub fn new(config: StageClientConfig) -> StageClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(StageClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StageClientResult<Self> {
        Self::new(StageClientConfig::from_env())
    }

    fn base_url(&self, stage: Stage) -> &str {
        match stage {
            Stage::Extraction => &self.config.extraction_url,
            Stage::Transcription => &self.config.transcription_url,
            Stage::Synthesis => &self.config.synthesis_url,
        }
    }

    fn endpoint(&self, stage: Stage) -> String {
        match stage {
            Stage::Extraction => format!("{}/process", self.config.extraction_url),
            Stage::Transcription => format!("{}/transcribe", self.config.transcription_url),
            Stage::Synthesis => format!("{}/process", self.config.synthesis_url),
        }
    }

    /// Check if a stage service is healthy.
    pub async fn health_check(&self, stage: Stage) -> bool {
        let url = format!("{}/health", self.base_url(stage));

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "healthy" || h.status == "ok")
                .unwrap_or(false),
            Ok(response) => {
                warn!("{} health check failed: {}", stage, response.status());
                false
            }
            Err(e) => {
                warn!("{} health check error: {}", stage, e);
                false
            }
        }
    }

    /// Dispatch the extraction stage with the uploaded video attached.
    /// Sent exactly once; a transient failure is reported, not retried.
    pub async fn dispatch_extraction(
        &self,
        job_id: &JobId,
        video_path: &Path,
    ) -> StageClientResult<Value> {
        self.dispatch_with_video(Stage::Extraction, job_id, video_path)
            .await
    }

    /// Dispatch the transcription stage with the uploaded video attached.
    /// Sent exactly once; a transient failure is reported, not retried.
    pub async fn dispatch_transcription(
        &self,
        job_id: &JobId,
        video_path: &Path,
    ) -> StageClientResult<Value> {
        self.dispatch_with_video(Stage::Transcription, job_id, video_path)
            .await
    }

    async fn dispatch_with_video(
        &self,
        stage: Stage,
        job_id: &JobId,
        video_path: &Path,
    ) -> StageClientResult<Value> {
        let url = self.endpoint(stage);
        debug!("Dispatching {} for job {} to {}", stage, job_id, url);

        let bytes = tokio::fs::read(video_path).await?;
        let part = multipart::Part::bytes(bytes)
            .file_name("video.mp4")
            .mime_str("video/mp4")
            .map_err(StageClientError::Network)?;
        let form = multipart::Form::new()
            .text("job_id", job_id.to_string())
            .part("video", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        parse_json_response(&url, response).await
    }

    /// Dispatch the synthesis stage. The payload is small JSON, so transient
    /// failures are retried with backoff.
    pub async fn dispatch_synthesis(
        &self,
        job_id: &JobId,
        extraction: &Value,
        transcript: &Value,
    ) -> StageClientResult<Value> {
        let url = self.endpoint(Stage::Synthesis);
        debug!("Dispatching synthesis for job {} to {}", job_id, url);

        let request = SynthesisRequest {
            job_id: job_id.as_str(),
            extraction,
            transcript,
        };

        let response = self
            .with_retry(|| async {
                self.http
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| self.classify(&url, e))
            })
            .await?;

        parse_json_response(&url, response).await
    }

    /// Classify a transport-level failure.
    fn classify(&self, url: &str, e: reqwest::Error) -> StageClientError {
        if e.is_timeout() {
            return StageClientError::Timeout(format!(
                "no response from {} within {}s",
                url,
                self.config.timeout.as_secs()
            ));
        }
        if is_tls_failure(&e) {
            return StageClientError::HandshakeFailure(format!(
                "TLS negotiation with {url} failed; the remote tunnel may be down"
            ));
        }
        if e.is_connect() {
            return StageClientError::Unreachable(format!("connection to {url} failed: {e}"));
        }
        StageClientError::Network(e)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> StageClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StageClientResult<T>>,
    {
        let max_retries = self.config.synthesis_max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Stage request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| StageClientError::Unreachable("unknown error".to_string())))
    }
}

/// Sniff the error source chain for a TLS negotiation failure. reqwest folds
/// these into its connect error, so the chain text is all there is to go on.
fn is_tls_failure(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.source();
    while let Some(err) = source {
        let text = err.to_string().to_lowercase();
        if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
            return true;
        }
        source = err.source();
    }
    false
}

async fn parse_json_response(url: &str, response: Response) -> StageClientResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StageClientError::Protocol {
            status: status.as_u16(),
            message: format!("{} returned: {}", url, body.trim()),
        });
    }

    let body = response.text().await.map_err(StageClientError::Network)?;
    if body.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_str(&body)?)
}
