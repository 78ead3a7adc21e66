//! Shared types for the achievement engine
//!
//! Webhook event schemas, identity fragments, user / unlock / event-log
//! records and time helpers used by the engine and any consumer of it.

pub mod models;
pub mod util;
pub mod webhook;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{LoggedEvent, UnlockRecord, UserId, UserRecord};
pub use webhook::{EventKind, IdentityFragment, WebhookError, WebhookEvent};
