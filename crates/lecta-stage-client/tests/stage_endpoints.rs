//! Stage client tests against fake HTTP endpoints.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lecta_models::JobId;
use lecta_stage_client::{StageClient, StageClientConfig, StageClientError};

async fn write_fake_video(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("video.mp4");
    tokio::fs::write(&path, b"fake video bytes").await.unwrap();
    path
}

fn client_for(server: &MockServer, timeout: Duration) -> StageClient {
    let config = StageClientConfig {
        extraction_url: server.uri(),
        transcription_url: server.uri(),
        synthesis_url: server.uri(),
        timeout,
        synthesis_max_retries: 2,
    };
    StageClient::new(config).unwrap()
}

#[tokio::test]
async fn extraction_dispatch_posts_video_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text_blocks": ["slide 1"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = write_fake_video(&dir).await;
    let client = client_for(&server, Duration::from_secs(5));

    let result = client
        .dispatch_extraction(&JobId::new(), &video)
        .await
        .unwrap();
    assert_eq!(result["text_blocks"][0], "slide 1");
}

#[tokio::test]
async fn transcription_uses_its_own_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transcribe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segments": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = write_fake_video(&dir).await;
    let client = client_for(&server, Duration::from_secs(5));

    client
        .dispatch_transcription(&JobId::new(), &video)
        .await
        .unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_protocol_error_with_no_retry() {
    let server = MockServer::start().await;
    // expect(1) verifies the video is uploaded at most once even on failure
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream worker gone"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = write_fake_video(&dir).await;
    let client = client_for(&server, Duration::from_secs(5));

    let err = client
        .dispatch_extraction(&JobId::new(), &video)
        .await
        .unwrap_err();
    match err {
        StageClientError::Protocol { status, ref message } => {
            assert_eq!(status, 502);
            assert!(message.contains("upstream worker gone"));
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("ProtocolError: HTTP 502"));
}

#[tokio::test]
async fn slow_endpoint_classifies_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let video = write_fake_video(&dir).await;
    let client = client_for(&server, Duration::from_millis(100));

    let err = client
        .dispatch_extraction(&JobId::new(), &video)
        .await
        .unwrap_err();
    assert!(matches!(err, StageClientError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_classifies_as_unreachable() {
    // Nothing listens on this port
    let config = StageClientConfig {
        extraction_url: "http://127.0.0.1:9".to_string(),
        ..StageClientConfig::default()
    };
    let client = StageClient::new(config).unwrap();

    let dir = TempDir::new().unwrap();
    let video = write_fake_video(&dir).await;

    let err = client
        .dispatch_extraction(&JobId::new(), &video)
        .await
        .unwrap_err();
    assert!(
        matches!(err, StageClientError::Unreachable(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn synthesis_posts_both_artifacts_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Intro to queues",
            "sections": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let result = client
        .dispatch_synthesis(
            &JobId::new(),
            &json!({"text_blocks": []}),
            &json!({"segments": []}),
        )
        .await
        .unwrap();
    assert_eq!(result["summary"], "Intro to queues");
}

#[tokio::test]
async fn synthesis_does_not_retry_protocol_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let err = client
        .dispatch_synthesis(&JobId::new(), &json!({}), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, StageClientError::Protocol { status: 400, .. }));
}

#[tokio::test]
async fn health_check_reads_status_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert!(client.health_check(lecta_models::Stage::Extraction).await);
}

#[tokio::test]
async fn health_check_is_false_when_service_is_down() {
    let config = StageClientConfig {
        extraction_url: "http://127.0.0.1:9".to_string(),
        ..StageClientConfig::default()
    };
    let client = StageClient::new(config).unwrap();
    assert!(!client.health_check(lecta_models::Stage::Extraction).await);
}
