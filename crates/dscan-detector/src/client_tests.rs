//! Detector client tests against a mock HTTP server.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dscan_models::{DetectionResult, MediaKind};

use crate::client::{DetectorClient, DetectorConfig};
use crate::error::DetectorError;

fn artifact(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"compressed bytes").unwrap();
    path
}

fn client_for(server: &MockServer, timeout: Duration) -> DetectorClient {
    let config = DetectorConfig::new(server.uri(), server.uri()).with_timeout(timeout);
    DetectorClient::new(config).unwrap()
}

#[tokio::test]
async fn test_video_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"score": 0.91, "is_deepfake": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, Duration::from_secs(5));
    let result = client
        .detect(MediaKind::Video, &artifact(&dir, "clip.mp4"), "clip.mp4")
        .await
        .unwrap();

    assert_eq!(
        result,
        DetectionResult {
            score: Some(0.91),
            is_deepfake: true
        }
    );

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"clip.mp4\""));
    assert!(body.contains("video/mp4"));
}

#[tokio::test]
async fn test_image_schema_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"probability": 0.83, "is_deepfake": true})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, Duration::from_secs(5));
    let result = client
        .detect(MediaKind::Image, &artifact(&dir, "photo.jpg"), "photo.jpg")
        .await
        .unwrap();

    assert_eq!(result.score, Some(0.83));
    assert!(result.is_deepfake);
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, Duration::from_secs(5));
    let err = client
        .detect(MediaKind::Video, &artifact(&dir, "clip.mp4"), "clip.mp4")
        .await
        .unwrap_err();

    match err {
        DetectorError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "model loading");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_reported_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"score": 0.1, "is_deepfake": false}))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, Duration::from_millis(100));
    let err = client
        .detect(MediaKind::Video, &artifact(&dir, "clip.mp4"), "clip.mp4")
        .await
        .unwrap_err();

    assert!(matches!(err, DetectorError::Timeout(_)));
    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn test_connection_refused() {
    let config = DetectorConfig::new("http://127.0.0.1:1", "http://127.0.0.1:1");
    let client = DetectorClient::new(config).unwrap();
    let dir = TempDir::new().unwrap();

    let err = client
        .detect(MediaKind::Image, &artifact(&dir, "photo.jpg"), "photo.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::Network(_)));
}

#[tokio::test]
async fn test_garbage_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verdict": "fake"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, Duration::from_secs(5));
    let err = client
        .detect(MediaKind::Image, &artifact(&dir, "photo.jpg"), "photo.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert!(client.health_check(MediaKind::Video).await.unwrap());

    let offline = DetectorClient::new(DetectorConfig::new("http://127.0.0.1:1", "http://127.0.0.1:1"))
        .unwrap();
    assert!(!offline.health_check(MediaKind::Image).await.unwrap());
}
