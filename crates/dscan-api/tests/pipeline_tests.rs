//! Upload pipeline behaviour against in-memory collaborators.

mod common;

use std::sync::atomic::Ordering;

use common::{DetectorMode, Faults, Harness};
use dscan_api::services::PipelineError;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_video_upload_success() {
    let harness = Harness::new(Faults::default());
    let pipeline = harness.pipeline();

    let file = harness.uploaded("holiday.mov", "video/quicktime", b"fake video bytes");
    let outcome = assert_ok!(pipeline.handle_upload("alice", Some(file)).await);

    assert_eq!(outcome.record.file_name, "holiday.mov");
    assert!(outcome.record.file_url.ends_with("holiday.mp4"));
    assert_eq!(outcome.record.score, Some(0.83));
    assert!(outcome.record.is_deepfake);

    assert_eq!(harness.store.record_count(), 1);
    assert_eq!(
        harness.detector.seen.lock().unwrap().as_slice(),
        ["holiday.mp4".to_string()]
    );
    assert!(harness.leftover_files().is_empty());
}

#[tokio::test]
async fn test_image_upload_success() {
    let harness = Harness::new(Faults {
        detector: DetectorMode::Ok(0.12),
        ..Faults::default()
    });
    let pipeline = harness.pipeline();

    let file = harness.uploaded("portrait.png", "image/png", b"fake png bytes");
    let outcome = assert_ok!(pipeline.handle_upload("bob", Some(file)).await);

    assert!(outcome.record.file_url.ends_with("portrait.jpg"));
    assert_eq!(outcome.record.score, Some(0.12));
    assert!(!outcome.record.is_deepfake);

    let stored = harness.store.docs.lock().unwrap().get("bob").cloned().unwrap();
    assert_eq!(stored.user_id, "bob");
    assert_eq!(stored.files, vec![outcome.record]);
    assert!(harness.leftover_files().is_empty());
}

#[tokio::test]
async fn test_missing_file() {
    let harness = Harness::new(Faults::default());

    let err = assert_err!(harness.pipeline().handle_upload("alice", None).await);

    assert!(matches!(err, PipelineError::NoFile));
    assert!(err.is_client_error());
    assert_eq!(harness.compressor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_media_type_removes_upload() {
    let harness = Harness::new(Faults::default());

    let file = harness.uploaded("report.pdf", "application/pdf", b"%PDF-1.7");
    let err = harness
        .pipeline()
        .handle_upload("alice", Some(file))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedMediaType(_)));
    assert!(err.is_client_error());
    assert_eq!(harness.compressor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.record_count(), 0);
    assert!(harness.leftover_files().is_empty());
}

#[tokio::test]
async fn test_file_not_visible() {
    let harness = Harness::new(Faults::default());

    let file = harness.uploaded("clip.mp4", "video/mp4", b"bytes");
    std::fs::remove_file(&file.path).unwrap();

    let err = harness
        .pipeline()
        .handle_upload("alice", Some(file))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FileNotVisible(_)));
    assert!(err.is_client_error());
    assert_eq!(harness.detector.calls.load(Ordering::SeqCst), 0);
}

/// Every upstream failure must leave no record and no temp file behind.
async fn assert_clean_failure(faults: Faults, mime: &str, expected_stage: &str) {
    let harness = Harness::new(faults);

    let file = harness.uploaded("input.bin", mime, b"payload");
    let err = harness
        .pipeline()
        .handle_upload("carol", Some(file))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), expected_stage, "unexpected error: {}", err);
    assert!(!err.is_client_error());
    assert_eq!(harness.store.record_count(), 0);
    assert!(
        harness.leftover_files().is_empty(),
        "leftover files: {:?}",
        harness.leftover_files()
    );
}

#[tokio::test]
async fn test_compression_failure() {
    assert_clean_failure(
        Faults {
            compress: true,
            ..Faults::default()
        },
        "video/mp4",
        "compress",
    )
    .await;
}

#[tokio::test]
async fn test_detector_timeout() {
    assert_clean_failure(
        Faults {
            detector: DetectorMode::Timeout,
            ..Faults::default()
        },
        "video/webm",
        "detect",
    )
    .await;
}

#[tokio::test]
async fn test_detector_error_status() {
    assert_clean_failure(
        Faults {
            detector: DetectorMode::Status(503),
            ..Faults::default()
        },
        "image/jpeg",
        "detect",
    )
    .await;
}

#[tokio::test]
async fn test_archive_failure() {
    assert_clean_failure(
        Faults {
            archive: true,
            ..Faults::default()
        },
        "image/webp",
        "archive",
    )
    .await;
}

#[tokio::test]
async fn test_persistence_failure_reports_orphan() {
    let harness = Harness::new(Faults {
        persist: true,
        ..Faults::default()
    });

    let file = harness.uploaded("clip.mp4", "video/mp4", b"payload");
    let err = harness
        .pipeline()
        .handle_upload("dave", Some(file))
        .await
        .unwrap_err();

    match err {
        PipelineError::Persistence { url, .. } => {
            assert!(url.starts_with("https://files.example.com/uploads/dave/"))
        }
        other => panic!("expected persistence error, got {}", other),
    }
    assert_eq!(harness.archive.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.store.record_count(), 0);
    assert!(harness.leftover_files().is_empty());
}

#[tokio::test]
async fn test_detector_failure_skips_archive() {
    let harness = Harness::new(Faults {
        detector: DetectorMode::Timeout,
        ..Faults::default()
    });

    let file = harness.uploaded("clip.mp4", "video/mp4", b"payload");
    let _ = harness.pipeline().handle_upload("erin", Some(file)).await;

    assert_eq!(harness.detector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.archive.calls.load(Ordering::SeqCst), 0);
}
