//! Pipeline event schema

use serde::Deserialize;

use super::identity::{ActorObject, FlatActorFields, IdentityFragment, resolve_actor};
use super::{EventKind, WebhookResult, invalid_body};

#[derive(Debug, Deserialize)]
struct RawPipeline {
    object_attributes: RawPipelineAttributes,
    #[serde(default)]
    user: Option<ActorObject>,
    #[serde(flatten)]
    flat: FlatActorFields,
}

#[derive(Debug, Deserialize)]
struct RawPipelineAttributes {
    status: String,
}

/// Pipeline status, collapsed to what the rules care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Success,
    Failed,
    /// pending, running, canceled, skipped, manual, ...
    Other(String),
}

impl From<&str> for PipelineStatus {
    fn from(status: &str) -> Self {
        match status {
            "success" => PipelineStatus::Success,
            "failed" => PipelineStatus::Failed,
            other => PipelineStatus::Other(other.to_string()),
        }
    }
}

/// Pipeline status change
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub actor: IdentityFragment,
    pub status: PipelineStatus,
}

impl PipelineEvent {
    pub(crate) fn from_body(body: &serde_json::Value) -> WebhookResult<Self> {
        let raw = RawPipeline::deserialize(body).map_err(invalid_body(EventKind::Pipeline))?;

        Ok(Self {
            actor: resolve_actor(raw.user.as_ref(), &raw.flat),
            status: PipelineStatus::from(raw.object_attributes.status.as_str()),
        })
    }
}
