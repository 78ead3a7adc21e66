//! Note (comment) event schema

use serde::Deserialize;

use super::identity::{ActorObject, FlatActorFields, IdentityFragment, resolve_actor};
use super::{EventKind, WebhookResult, invalid_body};

#[derive(Debug, Deserialize)]
struct RawNote {
    object_attributes: RawNoteAttributes,
    #[serde(default)]
    merge_request: Option<RawMergeRequest>,
    #[serde(default)]
    user: Option<ActorObject>,
    #[serde(flatten)]
    flat: FlatActorFields,
}

#[derive(Debug, Deserialize)]
struct RawNoteAttributes {
    #[serde(default)]
    author_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawMergeRequest {
    #[serde(default)]
    author_id: Option<i64>,
}

/// Merge request a comment was made on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestRef {
    /// Platform id of the merge request author
    pub author_id: Option<i64>,
}

/// Comment on a commit, issue, snippet or merge request
#[derive(Debug, Clone)]
pub struct NoteEvent {
    pub actor: IdentityFragment,
    /// Platform id of the comment author
    pub author_id: Option<i64>,
    pub merge_request: Option<MergeRequestRef>,
}

impl NoteEvent {
    pub(crate) fn from_body(body: &serde_json::Value) -> WebhookResult<Self> {
        let raw = RawNote::deserialize(body).map_err(invalid_body(EventKind::Note))?;

        Ok(Self {
            actor: resolve_actor(raw.user.as_ref(), &raw.flat),
            author_id: raw.object_attributes.author_id,
            merge_request: raw.merge_request.map(|mr| MergeRequestRef {
                author_id: mr.author_id,
            }),
        })
    }

    /// Comment made by the author of the merge request it was made on
    pub fn is_self_review(&self) -> bool {
        match (&self.merge_request, self.author_id) {
            (Some(mr), Some(author_id)) => mr.author_id == Some(author_id),
            _ => false,
        }
    }
}
