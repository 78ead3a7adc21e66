mod common;

use common::*;
use serde_json::json;
use tempfile::TempDir;

fn seed(service: &achievement_engine::AchievementService) {
    let events = vec![
        ("push", push("alice", "alice@example.com", "main", "2024-01-05T02:10:00Z")),
        ("push", push("alice", "alice@example.com", "feature/a", "2024-01-05T09:00:00Z")),
        ("note", note("bob", 2, 1, 100)),
        ("wiki_page", json!({"object_kind": "wiki_page", "user": {"username": "alice"}})),
    ];
    for (i, (kind, body)) in events.into_iter().enumerate() {
        let _ = service.ingest_event(kind, body, Some(JAN_5 + i as i64 * HOUR));
    }
    for id in 1..=12 {
        let status = if id == 5 { "failed" } else { "success" };
        service
            .ingest_event("pipeline", pipeline("bob", id, status), Some(JAN_5 + 10 * HOUR + id))
            .unwrap();
    }
}

#[test]
fn test_rebuild_twice_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);
    seed(&service);

    let live_unlocks = service.dump_unlocks().unwrap();
    let live_metadata = service.dump_metadata().unwrap();
    let live_users = service.list_users().unwrap();

    let first = service.rebuild().unwrap();
    let unlocks = service.dump_unlocks().unwrap();
    let metadata = service.dump_metadata().unwrap();

    let second = service.rebuild().unwrap();
    assert_eq!(first, second);
    assert_eq!(service.dump_unlocks().unwrap(), unlocks);
    assert_eq!(service.dump_metadata().unwrap(), metadata);

    // replay reaches the same state live ingestion did
    assert_eq!(unlocks, live_unlocks);
    assert_eq!(metadata, live_metadata);
    assert_eq!(service.list_users().unwrap(), live_users);

    // 2 pushes, 1 note, 1 wiki page, 12 pipelines
    assert_eq!(first.events, 16);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.evaluated, 15);
}

#[test]
fn test_state_survives_reopen_and_catch_up() {
    let dir = TempDir::new().unwrap();
    let unlocks = {
        let service = open_service(&dir);
        seed(&service);
        service.dump_unlocks().unwrap()
    };

    let service = open_service(&dir).with_rebuild_from_scratch(false);
    let report = service.rebuild().unwrap();

    assert_eq!(report.evaluated, 0);
    assert_eq!(report.already_applied, 15);
    assert_eq!(service.dump_unlocks().unwrap(), unlocks);
}

#[test]
fn test_unlock_timestamps_are_ingest_timestamps() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);

    service
        .ingest_event("pipeline", pipeline("erin", 1, "success"), Some(JAN_5 + 1))
        .unwrap();
    service
        .ingest_event("pipeline", pipeline("erin", 2, "success"), Some(JAN_5 + 2))
        .unwrap();
    service.rebuild().unwrap();

    let unlocks = service.dump_unlocks().unwrap();
    assert_eq!(unlocks.len(), 1);
    assert_eq!(unlocks[0].achievement, "On a roll");
    assert_eq!(unlocks[0].timestamp, JAN_5 + 2);

    let info = service.event_log_info().unwrap();
    assert_eq!(info.count, 2);
    assert_eq!(info.most_recent_timestamp, Some(JAN_5 + 2));
}

#[test]
fn test_late_hints_replay_to_live_state() {
    let dir = TempDir::new().unwrap();
    let (live_unlocks, live_metadata) = {
        let service = open_service(&dir);
        // received-at hints arrive out of order
        for (id, status, at) in [
            (1, "success", JAN_5 + 2 * HOUR),
            (2, "failed", JAN_5 + HOUR),
            (3, "success", JAN_5 + 3 * HOUR),
            (4, "success", JAN_5 + 30 * HOUR),
            (5, "failed", JAN_5 + 5 * HOUR),
        ] {
            service
                .ingest_event("pipeline", pipeline("zoe", id, status), Some(at))
                .unwrap();
        }
        (service.dump_unlocks().unwrap(), service.dump_metadata().unwrap())
    };

    let service = open_service(&dir);
    service.rebuild().unwrap();
    assert_eq!(service.dump_unlocks().unwrap(), live_unlocks);
    assert_eq!(service.dump_metadata().unwrap(), live_metadata);

    let info = service.event_log_info().unwrap();
    assert_eq!(info.most_recent_timestamp, Some(JAN_5 + 30 * HOUR));
}
