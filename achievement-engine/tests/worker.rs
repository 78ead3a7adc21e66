mod common;

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use achievement_engine::{CoreError, IngestWorker, import_directory};
use common::*;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_concurrent_identical_submissions_accepted_once() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(open_service(&dir));
    let (handle, worker) = IngestWorker::spawn(service.clone(), 16);

    let body = pipeline("bob", 42, "failed");
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handle = handle.clone();
        let body = body.clone();
        tasks.push(tokio::spawn(async move {
            handle.ingest("pipeline", body, Some(JAN_5)).await
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().accepted {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(service.event_log_info().unwrap().count, 1);

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_worker_reports_rejections() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(open_service(&dir));
    let (handle, worker) = IngestWorker::spawn(service, 4);

    let err = handle
        .ingest("pipeline", json!({"object_kind": "pipeline"}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::MalformedEvent(_)));

    let err = handle.ingest("deployment", json!({}), None).await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownEventKind(_)));

    drop(handle);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_worker_stopped_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(open_service(&dir));
    let (handle, worker) = IngestWorker::spawn(service, 4);

    worker.abort();
    let _ = worker.await;

    let err = handle
        .ingest("pipeline", pipeline("bob", 1, "failed"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::WorkerUnavailable));
}

#[tokio::test]
async fn test_import_directory() {
    let data = TempDir::new().unwrap();
    let archive = TempDir::new().unwrap();
    let service = Arc::new(open_service(&data));
    let (handle, worker) = IngestWorker::spawn(service.clone(), 4);

    let files = [
        ("001-push.json", push("alice", "alice@example.com", "main", "2024-01-05T12:00:00Z").to_string()),
        ("002-pipeline.json", pipeline("alice", 1, "success").to_string()),
        ("003-duplicate.json", pipeline("alice", 1, "success").to_string()),
        ("004-broken.json", "{not json".to_string()),
        ("005-no-kind.json", json!({"user": {"username": "x"}}).to_string()),
        ("notes.txt", "ignored".to_string()),
    ];
    for (name, content) in &files {
        std::fs::write(archive.path().join(name), content).unwrap();
    }

    let report = import_directory(&handle, archive.path()).await.unwrap();
    assert_eq!(report.files, 5);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.unlocked, 1);

    drop(handle);
    worker.await.unwrap();
    assert_eq!(service.event_log_info().unwrap().count, 2);
}

#[tokio::test]
async fn test_import_follows_modification_time() {
    let data = TempDir::new().unwrap();
    let archive = TempDir::new().unwrap();
    let service = Arc::new(open_service(&data));
    let (handle, worker) = IngestWorker::spawn(service.clone(), 4);

    // name order would put the failure between the two successes
    let files = [
        ("a.json", pipeline("zoe", 1, "success"), 2),
        ("b.json", pipeline("zoe", 2, "failed"), 1),
        ("c.json", pipeline("zoe", 3, "success"), 3),
    ];
    for (name, body, hours) in &files {
        let path = archive.path().join(name);
        std::fs::write(&path, body.to_string()).unwrap();
        let modified = UNIX_EPOCH + Duration::from_millis((JAN_5 + hours * HOUR) as u64);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    let report = import_directory(&handle, archive.path()).await.unwrap();
    assert_eq!(report.accepted, 3);
    assert_eq!(report.unlocked, 1);

    drop(handle);
    worker.await.unwrap();

    let unlocks = service.dump_unlocks().unwrap();
    assert_eq!(unlocks.len(), 1);
    assert_eq!(unlocks[0].achievement, "On a roll");
    assert_eq!(unlocks[0].timestamp, JAN_5 + 3 * HOUR);
}
