//! Identity resolution for webhook actors
//!
//! Webhook bodies describe their actor in one of two shapes:
//!
//! - a nested `user` object (`note`, `pipeline`, `merge_request`, ...)
//! - flat `user_*` fields on the body itself (`push`, `tag_push`)
//!
//! Both normalize to the same [`IdentityFragment`]. Empty strings become `None`.

use serde::{Deserialize, Serialize};

/// Partial identity of a platform user
///
/// Never a complete identity on its own: the user ledger merges fragments
/// into canonical user records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFragment {
    /// Platform numeric user id
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl IdentityFragment {
    /// Whether the fragment carries a key the ledger can match on (id, username or email)
    pub fn has_match_key(&self) -> bool {
        self.id.is_some() || self.username.is_some() || self.email.is_some()
    }

    /// Short human label for log lines
    pub fn label(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.id.map(|id| format!("#{}", id)))
            .or_else(|| self.display_name.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Nested `user` object shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorObject {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Flat `user_*` fields shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatActorFields {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_username: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_avatar: Option<String>,
}

/// Commit author shape (`commits[].author`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw actor description as found on an event body
#[derive(Debug, Clone, Copy)]
pub enum RawActor<'a> {
    Object(&'a ActorObject),
    Flat(&'a FlatActorFields),
    CommitAuthor(&'a CommitAuthor),
}

/// Normalize a raw actor description into an identity fragment
pub fn resolve(raw: RawActor<'_>) -> IdentityFragment {
    match raw {
        RawActor::Object(user) => IdentityFragment {
            id: user.id,
            username: non_empty(&user.username),
            email: non_empty(&user.email),
            display_name: non_empty(&user.name),
            avatar_url: non_empty(&user.avatar_url),
        },
        RawActor::Flat(fields) => IdentityFragment {
            id: fields.user_id,
            username: non_empty(&fields.user_username),
            email: non_empty(&fields.user_email),
            display_name: non_empty(&fields.user_name),
            avatar_url: non_empty(&fields.user_avatar),
        },
        RawActor::CommitAuthor(author) => IdentityFragment {
            id: None,
            username: None,
            email: non_empty(&author.email),
            display_name: non_empty(&author.name),
            avatar_url: None,
        },
    }
}

/// Pick the actor shape present on a body: the `user` object wins over flat fields
pub fn resolve_actor(user: Option<&ActorObject>, flat: &FlatActorFields) -> IdentityFragment {
    match user {
        Some(object) => resolve(RawActor::Object(object)),
        None => resolve(RawActor::Flat(flat)),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
