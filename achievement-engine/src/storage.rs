//! redb-based storage layer for the achievement engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(ingest_timestamp, sequence)` | `LoggedEvent` | Event log (append-only) |
//! | `event_fingerprints` | `fingerprint` | `sequence` | Dedup index |
//! | `evaluated_events` | `sequence` | `()` | Events already run through the rules |
//! | `sequence_counter` | `"seq"` | `u64` | Global insertion sequence |
//! | `users` | `user_id` | `UserRecord` | Canonical users |
//! | `users_by_id` | platform id | `user_id` | Identity index |
//! | `users_by_username` | username | `user_id` | Identity index |
//! | `users_by_email` | email | `user_id` | Identity index |
//! | `unlocks` | `(user_id, achievement)` | timestamp | Unlock records |
//! | `metadata` | `(user_id, achievement)` | JSON | Accumulator progress |
//!
//! The event log tables are permanent. Everything else is derived state and
//! can be dropped with [`Storage::reset_state`] and rebuilt by replay.
//!
//! # Atomicity
//!
//! redb admits a single write transaction at a time. Ingesting one event
//! (dedup, append, identity resolution, checker effects) happens inside one
//! write transaction, so it commits entirely or not at all.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Event log: key = (ingest_timestamp, sequence), value = JSON-serialized LoggedEvent
pub(crate) const EVENTS_TABLE: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("events");

/// Dedup index: key = content fingerprint, value = sequence
pub(crate) const FINGERPRINTS_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("event_fingerprints");

/// Sequences of events whose evaluation has been committed
pub(crate) const EVALUATED_TABLE: TableDefinition<u64, ()> =
    TableDefinition::new("evaluated_events");

/// Sequence counter: key = "seq", value = u64
pub(crate) const SEQUENCE_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("sequence_counter");

/// Users: key = user_id, value = JSON-serialized UserRecord
pub(crate) const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

pub(crate) const USERS_BY_ID_TABLE: TableDefinition<i64, &str> =
    TableDefinition::new("users_by_id");

pub(crate) const USERS_BY_USERNAME_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_username");

pub(crate) const USERS_BY_EMAIL_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("users_by_email");

/// Unlocks: key = (user_id, achievement), value = unlock timestamp
pub(crate) const UNLOCKS_TABLE: TableDefinition<(&str, &str), i64> =
    TableDefinition::new("unlocks");

/// Accumulator metadata: key = (user_id, achievement), value = JSON
pub(crate) const METADATA_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("metadata");

pub(crate) const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index points at missing user: {0}")]
    DanglingIndex(String),

    #[error("Identity fragment has no matchable field")]
    UnmatchableIdentity,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Shared handle to the achievement database
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable as soon as `commit()` returns (copy-on-write
    /// with an atomic root swap), so a crash mid-replay leaves every already
    /// committed event intact.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(FINGERPRINTS_TABLE)?;
            let _ = write_txn.open_table(EVALUATED_TABLE)?;
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        create_state_tables(&write_txn)?;
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Drop all derived state (users, unlocks, metadata, evaluation marks)
    ///
    /// The event log itself is never touched.
    pub fn reset_state(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(USERS_TABLE)?;
        txn.delete_table(USERS_BY_ID_TABLE)?;
        txn.delete_table(USERS_BY_USERNAME_TABLE)?;
        txn.delete_table(USERS_BY_EMAIL_TABLE)?;
        txn.delete_table(UNLOCKS_TABLE)?;
        txn.delete_table(METADATA_TABLE)?;
        txn.delete_table(EVALUATED_TABLE)?;
        create_state_tables(&txn)?;
        let _ = txn.open_table(EVALUATED_TABLE)?;
        txn.commit()?;

        tracing::info!("Derived achievement state cleared");
        Ok(())
    }
}

fn create_state_tables(txn: &WriteTransaction) -> StorageResult<()> {
    let _ = txn.open_table(USERS_TABLE)?;
    let _ = txn.open_table(USERS_BY_ID_TABLE)?;
    let _ = txn.open_table(USERS_BY_USERNAME_TABLE)?;
    let _ = txn.open_table(USERS_BY_EMAIL_TABLE)?;
    let _ = txn.open_table(UNLOCKS_TABLE)?;
    let _ = txn.open_table(METADATA_TABLE)?;
    Ok(())
}
