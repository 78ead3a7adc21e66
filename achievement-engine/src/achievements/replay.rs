//! Replay Coordinator
//!
//! Re-drives the event log through the evaluation engine in log order. Each
//! entry is evaluated and marked in its own write transaction, so an
//! interrupted rebuild keeps everything committed so far and the next run
//! picks up where it stopped.

use serde::Serialize;
use shared::models::LoggedEvent;
use shared::webhook::{EventKind, WebhookEvent};

use super::engine::EvaluationEngine;
use crate::events::EventLog;
use crate::storage::{Storage, StorageResult};

/// Summary of a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Log entries read
    pub events: usize,
    /// Entries evaluated by this run
    pub evaluated: usize,
    /// Entries of unknown kinds or that no longer validate
    pub skipped: usize,
    /// Entries already evaluated before this run
    pub already_applied: usize,
    /// Unlocks created by this run
    pub unlocked: usize,
    /// Checker failures across all entries
    pub failed_checkers: usize,
}

#[derive(Debug, Clone)]
pub struct ReplayCoordinator {
    storage: Storage,
    log: EventLog,
    engine: EvaluationEngine,
}

impl ReplayCoordinator {
    pub fn new(storage: Storage, log: EventLog, engine: EvaluationEngine) -> Self {
        Self {
            storage,
            log,
            engine,
        }
    }

    /// Rebuild achievement state from the event log
    ///
    /// With `from_scratch`, users, unlocks, metadata and evaluation marks are
    /// dropped first. Otherwise only entries not yet evaluated are applied.
    pub fn rebuild(&self, from_scratch: bool) -> StorageResult<ReplayReport> {
        if from_scratch {
            self.storage.reset_state()?;
        }

        let entries = self.log.list_all()?;
        let mut report = ReplayReport {
            events: entries.len(),
            ..Default::default()
        };
        tracing::info!(events = entries.len(), from_scratch, "Replaying event log");

        for entry in &entries {
            let Some(event) = self.validate(entry) else {
                report.skipped += 1;
                continue;
            };

            let txn = self.storage.begin_write()?;
            if self.log.is_evaluated_txn(&txn, entry.sequence)? {
                report.already_applied += 1;
                continue;
            }

            let outcome = self
                .engine
                .apply_txn(&txn, entry.sequence, &event, entry.ingest_timestamp)?;
            txn.commit()?;

            report.evaluated += 1;
            report.unlocked += outcome.unlocks.len();
            report.failed_checkers += outcome.failed_checkers.len();
        }

        tracing::info!(
            evaluated = report.evaluated,
            skipped = report.skipped,
            already_applied = report.already_applied,
            unlocked = report.unlocked,
            "Replay complete"
        );
        Ok(report)
    }

    /// Typed event for a log entry, `None` when it cannot be evaluated
    fn validate(&self, entry: &LoggedEvent) -> Option<WebhookEvent> {
        let Some(kind) = EventKind::parse(&entry.kind).filter(|k| self.engine.registry().handles(*k))
        else {
            tracing::debug!(sequence = entry.sequence, kind = %entry.kind, "No rules for logged kind");
            return None;
        };

        match WebhookEvent::parse(kind, &entry.body) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    sequence = entry.sequence,
                    kind = %entry.kind,
                    error = %e,
                    "Skipping historical event that no longer validates"
                );
                None
            }
        }
    }
}
