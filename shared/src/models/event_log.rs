//! Event log records

use serde::{Deserialize, Serialize};

/// Accepted webhook event as persisted in the event log
///
/// Immutable once written. `ingest_timestamp` is assigned by the log, not the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Insertion sequence (tie-breaker for equal timestamps)
    pub sequence: u64,
    /// Content fingerprint (hex SHA-256 of the canonical body)
    pub fingerprint: String,
    /// Unix millis
    pub ingest_timestamp: i64,
    /// Wire kind tag as received
    pub kind: String,
    pub body: serde_json::Value,
}

/// Event log summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogInfo {
    pub count: u64,
    pub most_recent_timestamp: Option<i64>,
}
