//! Push event schema

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::identity::{
    ActorObject, CommitAuthor, FlatActorFields, IdentityFragment, RawActor, resolve, resolve_actor,
};
use super::{EventKind, WebhookError, WebhookResult, invalid_body};
use crate::util::parse_timestamp;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(rename = "ref")]
    git_ref: String,
    commits: Vec<RawCommit>,
    #[serde(default)]
    user: Option<ActorObject>,
    #[serde(flatten)]
    flat: FlatActorFields,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    #[serde(default)]
    id: String,
    timestamp: String,
    #[serde(default)]
    author: CommitAuthor,
}

/// A single commit of a push
#[derive(Debug, Clone)]
pub struct Commit {
    pub id: String,
    /// Authoring time, as stated by the commit
    pub timestamp: DateTime<Utc>,
    pub author: IdentityFragment,
}

/// Push to a branch
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub actor: IdentityFragment,
    /// Full ref, e.g. `refs/heads/main`
    pub git_ref: String,
    pub commits: Vec<Commit>,
}

impl PushEvent {
    pub(crate) fn from_body(body: &serde_json::Value) -> WebhookResult<Self> {
        let raw = RawPush::deserialize(body).map_err(invalid_body(EventKind::Push))?;

        let commits = raw
            .commits
            .iter()
            .map(|commit| {
                let timestamp = parse_timestamp(&commit.timestamp)
                    .ok_or_else(|| WebhookError::InvalidTimestamp(commit.timestamp.clone()))?;
                Ok(Commit {
                    id: commit.id.clone(),
                    timestamp,
                    author: resolve(RawActor::CommitAuthor(&commit.author)),
                })
            })
            .collect::<WebhookResult<Vec<_>>>()?;

        Ok(Self {
            actor: resolve_actor(raw.user.as_ref(), &raw.flat),
            git_ref: raw.git_ref,
            commits,
        })
    }

    /// Branch name for `refs/heads/*` refs
    pub fn branch(&self) -> Option<&str> {
        self.git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .filter(|name| !name.is_empty())
    }
}
