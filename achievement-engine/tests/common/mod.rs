#![allow(dead_code)]

use achievement_engine::{AchievementService, RuleConfig, Storage};
use serde_json::{Value, json};
use tempfile::TempDir;

/// 2024-01-05T00:00:00Z
pub const JAN_5: i64 = 1_704_412_800_000;
pub const HOUR: i64 = 3_600_000;

pub fn open_service(dir: &TempDir) -> AchievementService {
    let storage = Storage::open(dir.path().join("achievements.redb")).unwrap();
    AchievementService::with_storage(storage, RuleConfig::default())
}

pub fn push(username: &str, email: &str, branch: &str, commit_time: &str) -> Value {
    json!({
        "object_kind": "push",
        "ref": format!("refs/heads/{}", branch),
        "user_name": username,
        "user_username": username,
        "user_email": email,
        "commits": [{
            "id": "b6568db1bc1dcd7f8b4d5a946b0b91f9dacd7327",
            "message": "Update Catalan translation",
            "timestamp": commit_time,
            "author": {"name": username, "email": email}
        }]
    })
}

pub fn pipeline(username: &str, id: i64, status: &str) -> Value {
    json!({
        "object_kind": "pipeline",
        "object_attributes": {"id": id, "ref": "main", "status": status},
        "user": {"name": username, "username": username}
    })
}

pub fn note(username: &str, author_id: i64, mr_author: i64, note_id: i64) -> Value {
    json!({
        "object_kind": "note",
        "user": {"id": author_id, "username": username},
        "object_attributes": {
            "id": note_id,
            "author_id": author_id,
            "noteable_type": "MergeRequest"
        },
        "merge_request": {"iid": 1, "author_id": mr_author}
    })
}
