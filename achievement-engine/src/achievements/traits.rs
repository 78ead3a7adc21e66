//! Checker contract
//!
//! A checker sees one validated event plus a [`StateView`] restricted to the
//! users that event involves, and returns the unlocks it proposes. Proposals
//! are applied by the engine; checkers never write unlock records themselves.

use chrono::{DateTime, Utc};
use enum_dispatch::enum_dispatch;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::models::UserId;
use shared::webhook::WebhookEvent;
use thiserror::Error;

use crate::storage::StorageError;

/// Failure of a single checker on a single event
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Corrupt metadata for {achievement}: {source}")]
    Metadata {
        achievement: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("User {0} is not involved in this event")]
    OutOfScope(UserId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CheckerResult<T> = Result<T, CheckerError>;

/// Candidate unlock, not yet durably applied
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnlockProposal {
    pub user_id: UserId,
    pub achievement: String,
}

impl UnlockProposal {
    pub fn new(user_id: &UserId, achievement: &str) -> Self {
        Self {
            user_id: user_id.clone(),
            achievement: achievement.to_string(),
        }
    }
}

/// A commit author resolved to a user
#[derive(Debug, Clone)]
pub struct CommitActor {
    pub user_id: UserId,
    /// Authoring time stated by the commit
    pub timestamp: DateTime<Utc>,
}

/// Everything a checker may know about the event under evaluation
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub event: &'a WebhookEvent,
    /// Resolved primary actor
    pub actor: UserId,
    /// One entry per commit with a matchable author (push events only)
    pub commit_authors: Vec<CommitActor>,
    /// Unix millis assigned by the event log
    pub ingest_timestamp: i64,
    /// UTC `YYYY-MM-DD` of the ingest timestamp, computed once per event
    pub ingest_date: String,
}

impl EvaluationContext<'_> {
    /// Users this event involves, actor first
    pub fn involved_users(&self) -> Vec<UserId> {
        let mut users = vec![self.actor.clone()];
        for author in &self.commit_authors {
            if !users.contains(&author.user_id) {
                users.push(author.user_id.clone());
            }
        }
        users
    }
}

/// Achievement state as seen by a checker
pub trait StateView {
    fn has_unlocked(&self, user_id: &UserId, achievement: &str) -> CheckerResult<bool>;

    /// Stored accumulator metadata, `None` when there is no progress yet
    fn get_metadata(&self, user_id: &UserId, achievement: &str) -> CheckerResult<Option<Value>>;

    fn set_metadata(&mut self, user_id: &UserId, achievement: &str, value: Value)
    -> CheckerResult<()>;

    fn clear_metadata(&mut self, user_id: &UserId, achievement: &str) -> CheckerResult<()>;
}

/// Load typed metadata, falling back to the default when absent
pub fn load_metadata<T>(
    state: &dyn StateView,
    user_id: &UserId,
    achievement: &str,
) -> CheckerResult<T>
where
    T: DeserializeOwned + Default,
{
    match state.get_metadata(user_id, achievement)? {
        Some(value) => serde_json::from_value(value).map_err(|source| CheckerError::Metadata {
            achievement: achievement.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// Store typed metadata
pub fn store_metadata<T: Serialize>(
    state: &mut dyn StateView,
    user_id: &UserId,
    achievement: &str,
    value: &T,
) -> CheckerResult<()> {
    let value = serde_json::to_value(value).map_err(|source| CheckerError::Metadata {
        achievement: achievement.to_string(),
        source,
    })?;
    state.set_metadata(user_id, achievement, value)
}

/// Static description of an achievement a checker can unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDef {
    pub name: &'static str,
    pub description: &'static str,
}

/// Rule checker trait
///
/// Implemented by every checker and dispatched statically through
/// [`Checker`](super::checkers::Checker).
#[enum_dispatch]
pub trait RuleChecker {
    /// Checker name, used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Achievements this checker can propose
    fn achievements(&self) -> &'static [AchievementDef];

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>>;
}
