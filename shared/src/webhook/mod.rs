//! Webhook events - typed schemas for the platform's activity feed
//!
//! Raw bodies are validated once at the ingestion boundary and turned into a
//! [`WebhookEvent`]. Rule checkers only ever see the typed form.

pub mod identity;
pub mod note;
pub mod pipeline;
pub mod push;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use identity::{IdentityFragment, RawActor, resolve, resolve_actor};
pub use note::{MergeRequestRef, NoteEvent};
pub use pipeline::{PipelineEvent, PipelineStatus};
pub use push::{Commit, PushEvent};

/// Webhook body validation errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Event body must be a JSON object")]
    NotAnObject,

    #[error("Invalid {kind} body: {source}")]
    InvalidBody {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("object_kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: EventKind, found: String },

    #[error("Event has no resolvable actor (id, username or email required)")]
    MissingActor,

    #[error("Invalid commit timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("No schema for event kind: {0}")]
    UnsupportedKind(EventKind),
}

pub type WebhookResult<T> = Result<T, WebhookError>;

/// Event kind discriminant (`object_kind` / `X-Gitlab-Event`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    TagPush,
    Issue,
    Note,
    MergeRequest,
    WikiPage,
    Pipeline,
    Build,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Push,
        EventKind::TagPush,
        EventKind::Issue,
        EventKind::Note,
        EventKind::MergeRequest,
        EventKind::WikiPage,
        EventKind::Pipeline,
        EventKind::Build,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::TagPush => "tag_push",
            EventKind::Issue => "issue",
            EventKind::Note => "note",
            EventKind::MergeRequest => "merge_request",
            EventKind::WikiPage => "wiki_page",
            EventKind::Pipeline => "pipeline",
            EventKind::Build => "build",
        }
    }

    /// Parse a wire kind tag, `None` for kinds the platform does not emit
    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated webhook event, one variant per evaluated kind
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Push(PushEvent),
    Note(NoteEvent),
    Pipeline(PipelineEvent),
}

impl WebhookEvent {
    /// Validate a raw body against the schema of `kind`
    ///
    /// The body's own `object_kind`, when present, must agree with `kind`.
    pub fn parse(kind: EventKind, body: &serde_json::Value) -> WebhookResult<Self> {
        let object = body.as_object().ok_or(WebhookError::NotAnObject)?;

        if let Some(found) = object.get("object_kind").and_then(|v| v.as_str())
            && found != kind.as_str()
        {
            return Err(WebhookError::KindMismatch {
                expected: kind,
                found: found.to_string(),
            });
        }

        let event = match kind {
            EventKind::Push => WebhookEvent::Push(PushEvent::from_body(body)?),
            EventKind::Note => WebhookEvent::Note(NoteEvent::from_body(body)?),
            EventKind::Pipeline => WebhookEvent::Pipeline(PipelineEvent::from_body(body)?),
            other => return Err(WebhookError::UnsupportedKind(other)),
        };

        if !event.actor().has_match_key() {
            return Err(WebhookError::MissingActor);
        }

        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            WebhookEvent::Push(_) => EventKind::Push,
            WebhookEvent::Note(_) => EventKind::Note,
            WebhookEvent::Pipeline(_) => EventKind::Pipeline,
        }
    }

    /// Primary actor of the event
    pub fn actor(&self) -> &IdentityFragment {
        match self {
            WebhookEvent::Push(e) => &e.actor,
            WebhookEvent::Note(e) => &e.actor,
            WebhookEvent::Pipeline(e) => &e.actor,
        }
    }
}

pub(crate) fn invalid_body(kind: EventKind) -> impl FnOnce(serde_json::Error) -> WebhookError {
    move |source| WebhookError::InvalidBody { kind, source }
}
