//! Evaluation Engine
//!
//! Runs the checkers registered for one event's kind, in order, and applies
//! their proposals through the idempotent unlock primitive. Everything happens
//! inside the caller's write transaction:
//!
//! ```text
//! resolve actor + commit authors ─▶ checker 1 ─▶ checker 2 ─▶ ... ─▶ unlock proposals ─▶ mark evaluated
//!                                   (overlay)    (overlay)
//! ```
//!
//! A checker that fails has its staged metadata discarded and proposes
//! nothing; its siblings still run. Storage failures abort the whole event.

use std::sync::Arc;

use redb::WriteTransaction;
use shared::models::UnlockRecord;
use shared::webhook::WebhookEvent;

use super::registry::RuleRegistry;
use super::state::StagedState;
use super::store::AchievementStore;
use super::traits::{CheckerError, CommitActor, EvaluationContext, RuleChecker, UnlockProposal};
use crate::events::EventLog;
use crate::storage::StorageResult;
use crate::users::UserLedger;
use crate::utils::time::date_label;

/// Result of evaluating one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    /// Unlocks created by this event
    pub unlocks: Vec<UnlockRecord>,
    /// Proposals for achievements the user already had
    pub duplicates: Vec<UnlockProposal>,
    /// Names of checkers that failed on this event
    pub failed_checkers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    registry: Arc<RuleRegistry>,
    ledger: UserLedger,
    store: AchievementStore,
    log: EventLog,
}

impl EvaluationEngine {
    pub fn new(
        registry: Arc<RuleRegistry>,
        ledger: UserLedger,
        store: AchievementStore,
        log: EventLog,
    ) -> Self {
        Self {
            registry,
            ledger,
            store,
            log,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate the logged event `sequence` and mark it evaluated
    ///
    /// `ingest_timestamp` is the log's timestamp for the entry; it stamps
    /// every unlock and provides the ingest date.
    pub fn apply_txn(
        &self,
        txn: &WriteTransaction,
        sequence: u64,
        event: &WebhookEvent,
        ingest_timestamp: i64,
    ) -> StorageResult<EvaluationOutcome> {
        let mut outcome = EvaluationOutcome::default();

        if let Some(checkers) = self.registry.checkers_for(event.kind()) {
            let ctx = self.build_context(txn, event, ingest_timestamp)?;
            let scope = ctx.involved_users();

            let mut proposals = Vec::new();
            for checker in checkers {
                let mut staged = StagedState::new(&self.store, txn, &scope);
                match checker.evaluate(&mut staged, &ctx) {
                    Ok(found) => {
                        staged.flush()?;
                        proposals.extend(found);
                    }
                    Err(CheckerError::Storage(e)) => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            checker = checker.name(),
                            sequence,
                            error = %e,
                            "Checker failed, skipping its result"
                        );
                        outcome.failed_checkers.push(checker.name().to_string());
                    }
                }
            }

            for proposal in proposals {
                self.apply_proposal(txn, proposal, ingest_timestamp, &mut outcome)?;
            }
        }

        self.log.mark_evaluated_txn(txn, sequence)?;
        Ok(outcome)
    }

    fn build_context<'e>(
        &self,
        txn: &WriteTransaction,
        event: &'e WebhookEvent,
        ingest_timestamp: i64,
    ) -> StorageResult<EvaluationContext<'e>> {
        let actor = self.ledger.lookup_or_create_txn(txn, event.actor())?;

        let mut commit_authors = Vec::new();
        if let WebhookEvent::Push(push) = event {
            for commit in &push.commits {
                if !commit.author.has_match_key() {
                    tracing::debug!(commit = %commit.id, "Commit author has no email, skipped");
                    continue;
                }
                let user_id = self.ledger.lookup_or_create_txn(txn, &commit.author)?;
                commit_authors.push(CommitActor {
                    user_id,
                    timestamp: commit.timestamp,
                });
            }
        }

        Ok(EvaluationContext {
            event,
            actor,
            commit_authors,
            ingest_timestamp,
            ingest_date: date_label(ingest_timestamp),
        })
    }

    fn apply_proposal(
        &self,
        txn: &WriteTransaction,
        proposal: UnlockProposal,
        timestamp: i64,
        outcome: &mut EvaluationOutcome,
    ) -> StorageResult<()> {
        let UnlockProposal {
            user_id,
            achievement,
        } = proposal;

        if self.store.unlock_txn(txn, &user_id, &achievement, timestamp)? {
            tracing::info!(user_id = %user_id, achievement = %achievement, "Achievement unlocked");
            outcome.unlocks.push(UnlockRecord {
                user_id,
                achievement,
                timestamp,
            });
        } else {
            tracing::debug!(user_id = %user_id, achievement = %achievement, "Already unlocked");
            outcome.duplicates.push(UnlockProposal {
                user_id,
                achievement,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::checkers::test_support::{
        NIGHT_INGEST, NOON_INGEST, parse, pipeline_body, push_body,
    };
    use crate::achievements::checkers::{NightsWatchman, NotYourDay};
    use crate::core::config::RuleConfig;
    use crate::storage::Storage;
    use serde_json::json;
    use shared::webhook::EventKind;

    fn create_engine(registry: RuleRegistry) -> (Storage, EvaluationEngine) {
        let storage = Storage::open_in_memory().unwrap();
        let engine = EvaluationEngine::new(
            Arc::new(registry),
            UserLedger::new(storage.clone()),
            AchievementStore::new(storage.clone()),
            EventLog::new(storage.clone()),
        );
        (storage, engine)
    }

    fn apply(
        storage: &Storage,
        engine: &EvaluationEngine,
        seq: u64,
        event: &WebhookEvent,
        ts: i64,
    ) -> EvaluationOutcome {
        let txn = storage.begin_write().unwrap();
        let outcome = engine.apply_txn(&txn, seq, event, ts).unwrap();
        txn.commit().unwrap();
        outcome
    }

    #[test]
    fn test_push_unlocks_for_actor_and_night_authors() {
        let (storage, engine) = create_engine(RuleRegistry::from_config(&RuleConfig::default()));
        let event = parse(
            EventKind::Push,
            &push_body("alice", "main", &[("alice@example.com", "2024-01-05T02:00:00Z")]),
        );

        let outcome = apply(&storage, &engine, 1, &event, NIGHT_INGEST);

        let names: Vec<&str> = outcome.unlocks.iter().map(|u| u.achievement.as_str()).collect();
        assert_eq!(names, vec!["First blood", "Night's watchman"]);
        assert!(outcome.unlocks.iter().all(|u| u.timestamp == NIGHT_INGEST));
        // pusher (by username) and author (by email) are distinct users here
        assert_ne!(outcome.unlocks[0].user_id, outcome.unlocks[1].user_id);
    }

    #[test]
    fn test_second_push_unlocks_nothing() {
        let mut registry = RuleRegistry::new();
        registry.register(
            EventKind::Push,
            NightsWatchman {
                start_hour: 0,
                end_hour: 24,
            },
        );
        let (storage, engine) = create_engine(registry);
        let event = parse(
            EventKind::Push,
            &push_body("alice", "main", &[("alice@example.com", "2024-01-05T12:00:00Z")]),
        );

        let first = apply(&storage, &engine, 1, &event, NOON_INGEST);
        assert_eq!(first.unlocks.len(), 1);

        let second = apply(&storage, &engine, 2, &event, NOON_INGEST);
        assert!(second.unlocks.is_empty());
        // already unlocked: the checker itself filters it out
        assert!(second.duplicates.is_empty());
    }

    #[test]
    fn test_failing_checker_is_isolated() {
        let mut registry = RuleRegistry::new();
        registry
            .register(EventKind::Pipeline, NotYourDay { threshold: 1 })
            .register(EventKind::Pipeline, crate::achievements::checkers::PipelineStreak);
        let (storage, engine) = create_engine(registry);

        // Seed bob, then corrupt the streak metadata
        let event = parse(EventKind::Pipeline, &pipeline_body("bob", 1, "failed"));
        apply(&storage, &engine, 1, &event, NOON_INGEST);
        let bob = UserLedger::new(storage.clone())
            .list_all()
            .unwrap()
            .remove(0)
            .user_id;
        let store = AchievementStore::new(storage.clone());
        let txn = storage.begin_write().unwrap();
        store
            .set_metadata_txn(&txn, &bob, "Pipeline streak", &json!({"streak": "many"}))
            .unwrap();
        txn.commit().unwrap();

        let event = parse(EventKind::Pipeline, &pipeline_body("bob", 2, "failed"));
        let outcome = apply(&storage, &engine, 2, &event, NOON_INGEST);

        assert_eq!(outcome.failed_checkers, vec!["pipeline_streak".to_string()]);
        // sibling still ran and proposed (already unlocked by the first event)
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(
            store.get_metadata(&bob, "Pipeline streak").unwrap(),
            Some(json!({"streak": "many"}))
        );
    }

    #[test]
    fn test_event_marked_evaluated() {
        let (storage, engine) = create_engine(RuleRegistry::from_config(&RuleConfig::default()));
        let event = parse(EventKind::Pipeline, &pipeline_body("bob", 1, "success"));
        apply(&storage, &engine, 7, &event, NOON_INGEST);

        let log = EventLog::new(storage.clone());
        let txn = storage.begin_write().unwrap();
        assert!(log.is_evaluated_txn(&txn, 7).unwrap());
    }
}
