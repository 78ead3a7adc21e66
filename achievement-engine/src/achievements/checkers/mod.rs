//! Rule checker implementations
//!
//! Each checker implements [`RuleChecker`] for one achievement family.
//! [`Checker`] dispatches to them statically.

use enum_dispatch::enum_dispatch;

use super::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
};

mod branch_juggler;
mod first_blood;
mod nights_watchman;
mod not_your_day;
mod pipeline_streak;
mod reviewer_rank;
pub mod tiers;
mod you_see_my_point;

pub use branch_juggler::BranchJuggler;
pub use first_blood::FirstBlood;
pub use nights_watchman::NightsWatchman;
pub use not_your_day::NotYourDay;
pub use pipeline_streak::PipelineStreak;
pub use reviewer_rank::ReviewerRank;
pub use you_see_my_point::YouSeeMyPoint;

/// Checker enum - dispatches to the concrete checker implementations
#[enum_dispatch(RuleChecker)]
#[derive(Debug, Clone)]
pub enum Checker {
    FirstBlood(FirstBlood),
    NightsWatchman(NightsWatchman),
    BranchJuggler(BranchJuggler),
    YouSeeMyPoint(YouSeeMyPoint),
    ReviewerRank(ReviewerRank),
    NotYourDay(NotYourDay),
    PipelineStreak(PipelineStreak),
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{Value, json};
    use shared::models::UserId;
    use shared::webhook::{EventKind, WebhookEvent};

    use crate::achievements::traits::{CommitActor, EvaluationContext};
    use crate::utils::time::date_label;

    /// 2024-01-05T02:00:00Z
    pub const NIGHT_INGEST: i64 = 1_704_420_000_000;
    /// 2024-01-05T12:00:00Z
    pub const NOON_INGEST: i64 = 1_704_456_000_000;

    pub fn parse(kind: EventKind, body: &Value) -> WebhookEvent {
        WebhookEvent::parse(kind, body).unwrap()
    }

    /// Context with the actor resolved to its username and commit authors to their email
    pub fn context(event: &WebhookEvent, ingest_timestamp: i64) -> EvaluationContext<'_> {
        let actor = event
            .actor()
            .username
            .clone()
            .unwrap_or_else(|| "anonymous".to_string());
        let commit_authors = match event {
            WebhookEvent::Push(push) => push
                .commits
                .iter()
                .filter_map(|commit| {
                    commit.author.email.as_deref().map(|email| CommitActor {
                        user_id: UserId::from(email),
                        timestamp: commit.timestamp,
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        EvaluationContext {
            event,
            actor: UserId::new(actor),
            commit_authors,
            ingest_timestamp,
            ingest_date: date_label(ingest_timestamp),
        }
    }

    pub fn push_body(username: &str, branch: &str, commits: &[(&str, &str)]) -> Value {
        let commits: Vec<Value> = commits
            .iter()
            .enumerate()
            .map(|(i, (email, timestamp))| {
                json!({
                    "id": format!("{:040x}", i + 1),
                    "timestamp": timestamp,
                    "author": {"name": email, "email": email}
                })
            })
            .collect();

        json!({
            "object_kind": "push",
            "ref": format!("refs/heads/{}", branch),
            "user_username": username,
            "commits": commits
        })
    }

    pub fn note_body(username: &str, author_id: i64, mr_author: Option<i64>) -> Value {
        let mut body = json!({
            "object_kind": "note",
            "user": {"id": author_id, "username": username},
            "object_attributes": {"author_id": author_id, "noteable_type": "MergeRequest"}
        });
        if let Some(mr_author) = mr_author {
            body["merge_request"] = json!({"iid": 1, "author_id": mr_author});
        }
        body
    }

    pub fn pipeline_body(username: &str, id: i64, status: &str) -> Value {
        json!({
            "object_kind": "pipeline",
            "object_attributes": {"id": id, "status": status, "ref": "main"},
            "user": {"username": username}
        })
    }
}
