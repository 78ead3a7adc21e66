//! Append-only, deduplicated event log
//!
//! Entries are keyed by `(ingest_timestamp, sequence)`, so a plain table scan
//! yields them ordered by ingest time with ties broken by insertion order.
//!
//! The assigned ingest timestamp never goes below the latest logged one, so
//! log order is always acceptance order and live evaluation sees events in
//! the order replay does.

use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};
use serde_json::Value;
use shared::models::{EventLogInfo, LoggedEvent};

use super::fingerprint::fingerprint;
use crate::storage::{
    EVALUATED_TABLE, EVENTS_TABLE, FINGERPRINTS_TABLE, SEQUENCE_KEY, SEQUENCE_TABLE, Storage,
    StorageResult,
};

/// Event log over the shared achievement database
#[derive(Debug, Clone)]
pub struct EventLog {
    storage: Storage,
}

impl EventLog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ========== Append ==========

    /// Append an event within a transaction
    ///
    /// Returns `None` when a body with the same fingerprint is already logged.
    /// The dedup check and the insert share the write transaction, so
    /// concurrent identical submissions are accepted at most once.
    ///
    /// `received_at` is a hint: a value earlier than the newest entry is
    /// raised to that entry's timestamp. The returned event carries the
    /// timestamp actually assigned.
    pub fn append_txn(
        &self,
        txn: &WriteTransaction,
        kind: &str,
        body: &Value,
        received_at: i64,
    ) -> StorageResult<Option<LoggedEvent>> {
        let fingerprint = fingerprint(body);

        {
            let fingerprints = txn.open_table(FINGERPRINTS_TABLE)?;
            if let Some(existing) = fingerprints.get(fingerprint.as_str())? {
                tracing::debug!(
                    fingerprint = %fingerprint,
                    sequence = existing.value(),
                    "Duplicate event ignored"
                );
                return Ok(None);
            }
        }

        let ingest_timestamp = self.assign_timestamp(txn, received_at)?;
        let sequence = self.increment_sequence(txn)?;
        let event = LoggedEvent {
            sequence,
            fingerprint,
            ingest_timestamp,
            kind: kind.to_string(),
            body: body.clone(),
        };

        let value = serde_json::to_vec(&event)?;
        txn.open_table(EVENTS_TABLE)?
            .insert((ingest_timestamp, sequence), value.as_slice())?;
        txn.open_table(FINGERPRINTS_TABLE)?
            .insert(event.fingerprint.as_str(), sequence)?;

        tracing::debug!(
            sequence,
            kind = %event.kind,
            fingerprint = %event.fingerprint,
            "Event logged"
        );
        Ok(Some(event))
    }

    /// Append an event in its own transaction, returns whether it was accepted
    pub fn append(&self, kind: &str, body: &Value, received_at: i64) -> StorageResult<bool> {
        let txn = self.storage.begin_write()?;
        let accepted = self.append_txn(&txn, kind, body, received_at)?.is_some();
        txn.commit()?;
        Ok(accepted)
    }

    fn assign_timestamp(&self, txn: &WriteTransaction, received_at: i64) -> StorageResult<i64> {
        let table = txn.open_table(EVENTS_TABLE)?;
        let latest = table.last()?.map(|(key, _value)| key.value().0);

        match latest {
            Some(latest) if latest > received_at => {
                tracing::debug!(received_at, latest, "Ingest timestamp raised to log head");
                Ok(latest)
            }
            _ => Ok(received_at),
        }
    }

    fn increment_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    // ========== Read ==========

    /// All logged events, ordered by ingest timestamp then insertion order
    pub fn list_all(&self) -> StorageResult<Vec<LoggedEvent>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: LoggedEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        Ok(events)
    }

    /// Entry count and most recent ingest timestamp
    pub fn info(&self) -> StorageResult<EventLogInfo> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let count = table.len()?;
        let most_recent_timestamp = table.last()?.map(|(key, _value)| key.value().0);

        Ok(EventLogInfo {
            count,
            most_recent_timestamp,
        })
    }

    // ========== Evaluation Marks ==========

    /// Whether the evaluation of this entry has been committed
    pub fn is_evaluated_txn(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<bool> {
        let table = txn.open_table(EVALUATED_TABLE)?;
        Ok(table.get(sequence)?.is_some())
    }

    /// Mark an entry as evaluated (same transaction as its evaluation)
    pub fn mark_evaluated_txn(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(EVALUATED_TABLE)?;
        table.insert(sequence, ())?;
        Ok(())
    }
}
