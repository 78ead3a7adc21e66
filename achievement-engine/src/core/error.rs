use thiserror::Error;

use crate::storage::StorageError;
use shared::webhook::WebhookError;

/// Errors surfaced to callers of the achievement service
#[derive(Error, Debug)]
pub enum CoreError {
    /// Body fails validation for its kind; neither logged nor evaluated
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] WebhookError),

    /// No rules for this kind; never evaluated
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    /// The event was not ingested and must be retried by the caller
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ingest worker is not running")]
    WorkerUnavailable,
}

pub type CoreResult<T> = Result<T, CoreError>;
