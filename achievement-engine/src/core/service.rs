//! Achievement service - the facade the transport layer talks to
//!
//! One accepted event runs through a single write transaction:
//!
//! ```text
//! validate ─▶ [ dedup + append ─▶ resolve users ─▶ checkers ─▶ unlocks ─▶ mark evaluated ] ─▶ commit
//! ```
//!
//! Validation failures never touch the log. A storage failure anywhere inside
//! the transaction aborts it, so the event is neither logged nor evaluated and
//! the caller can retry.

use std::sync::Arc;

use serde_json::Value;
use shared::models::{AchievementInfo, EventLogInfo, UnlockRecord, UserProfile, UserRecord};
use shared::util::now_millis;
use shared::webhook::{EventKind, WebhookEvent};

use super::config::{Config, RuleConfig};
use super::error::{CoreError, CoreResult};
use crate::achievements::{
    AchievementStore, EvaluationEngine, MetadataEntry, ReplayCoordinator, ReplayReport,
    RuleRegistry, UnlockProposal,
};
use crate::events::EventLog;
use crate::storage::{Storage, StorageResult};
use crate::users::UserLedger;

/// Result of ingesting one event
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// `false` when the body was already logged
    pub accepted: bool,
    /// Log sequence assigned to the event (accepted events only)
    pub sequence: Option<u64>,
    pub ingest_timestamp: i64,
    /// Unlocks created by this event
    pub unlocks: Vec<UnlockRecord>,
    /// Proposals for achievements already held
    pub duplicates: Vec<UnlockProposal>,
    pub failed_checkers: Vec<String>,
}

impl IngestOutcome {
    fn duplicate(ingest_timestamp: i64) -> Self {
        Self {
            accepted: false,
            sequence: None,
            ingest_timestamp,
            unlocks: Vec::new(),
            duplicates: Vec::new(),
            failed_checkers: Vec::new(),
        }
    }
}

/// Replayable rule-evaluation core
#[derive(Debug, Clone)]
pub struct AchievementService {
    storage: Storage,
    log: EventLog,
    ledger: UserLedger,
    store: AchievementStore,
    engine: EvaluationEngine,
    replay: ReplayCoordinator,
    rebuild_from_scratch: bool,
    log_unknown_events: bool,
}

impl AchievementService {
    /// Open the database under the configured data directory
    pub fn open(config: &Config) -> CoreResult<Self> {
        std::fs::create_dir_all(&config.data_directory)?;
        let storage = Storage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Achievement database opened");

        Ok(Self::with_storage(storage, config.rules.clone())
            .with_rebuild_from_scratch(config.rebuild_from_scratch)
            .with_log_unknown_events(config.log_unknown_events))
    }

    /// Build the service over an already opened database
    pub fn with_storage(storage: Storage, rules: RuleConfig) -> Self {
        let registry = Arc::new(RuleRegistry::from_config(&rules));
        let log = EventLog::new(storage.clone());
        let ledger = UserLedger::new(storage.clone());
        let store = AchievementStore::new(storage.clone());
        let engine = EvaluationEngine::new(registry, ledger.clone(), store.clone(), log.clone());
        let replay = ReplayCoordinator::new(storage.clone(), log.clone(), engine.clone());

        Self {
            storage,
            log,
            ledger,
            store,
            engine,
            replay,
            rebuild_from_scratch: true,
            log_unknown_events: true,
        }
    }

    pub fn with_rebuild_from_scratch(mut self, enabled: bool) -> Self {
        self.rebuild_from_scratch = enabled;
        self
    }

    pub fn with_log_unknown_events(mut self, enabled: bool) -> Self {
        self.log_unknown_events = enabled;
        self
    }

    // ========== Ingestion ==========

    /// Ingest one inbound event
    ///
    /// `received_at` (Unix millis) is the ingest timestamp hint, defaulting
    /// to the current time. The log never assigns a timestamp earlier than
    /// its newest entry, see [`EventLog::append_txn`].
    pub fn ingest_event(
        &self,
        kind: &str,
        body: Value,
        received_at: Option<i64>,
    ) -> CoreResult<IngestOutcome> {
        let received_at = received_at.unwrap_or_else(now_millis);

        let Some(event_kind) = EventKind::parse(kind).filter(|k| self.engine.registry().handles(*k))
        else {
            if self.log_unknown_events {
                let accepted = self.log.append(kind, &body, received_at)?;
                tracing::debug!(kind, accepted, "Event of unknown kind logged");
            }
            return Err(CoreError::UnknownEventKind(kind.to_string()));
        };

        let event = WebhookEvent::parse(event_kind, &body)?;
        Ok(self.append_and_evaluate(event_kind, &body, &event, received_at)?)
    }

    fn append_and_evaluate(
        &self,
        kind: EventKind,
        body: &Value,
        event: &WebhookEvent,
        received_at: i64,
    ) -> StorageResult<IngestOutcome> {
        let txn = self.storage.begin_write()?;

        let Some(logged) = self.log.append_txn(&txn, kind.as_str(), body, received_at)? else {
            return Ok(IngestOutcome::duplicate(received_at));
        };

        let outcome = self
            .engine
            .apply_txn(&txn, logged.sequence, event, logged.ingest_timestamp)?;
        txn.commit()?;

        tracing::debug!(
            sequence = logged.sequence,
            kind = %kind,
            actor = %event.actor().label(),
            unlocks = outcome.unlocks.len(),
            "Event evaluated"
        );

        Ok(IngestOutcome {
            accepted: true,
            sequence: Some(logged.sequence),
            ingest_timestamp: logged.ingest_timestamp,
            unlocks: outcome.unlocks,
            duplicates: outcome.duplicates,
            failed_checkers: outcome.failed_checkers,
        })
    }

    // ========== Replay ==========

    /// Rebuild achievement state from the event log
    ///
    /// Must complete before live events are accepted.
    pub fn rebuild(&self) -> CoreResult<ReplayReport> {
        Ok(self.replay.rebuild(self.rebuild_from_scratch)?)
    }

    // ========== Queries ==========

    /// All users, emails included; strip them before external exposure
    pub fn list_users(&self) -> CoreResult<Vec<UserRecord>> {
        Ok(self.ledger.list_all()?)
    }

    /// User with unlocked achievements, oldest unlock first
    pub fn get_user(&self, user_id: &str) -> CoreResult<Option<UserProfile>> {
        let Some(user) = self.ledger.get(user_id)? else {
            return Ok(None);
        };

        let mut achievements = self.store.unlocks_for_user(&user.user_id)?;
        achievements.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.name.cmp(&b.name)));

        Ok(Some(UserProfile { user, achievements }))
    }

    pub fn event_log_info(&self) -> CoreResult<EventLogInfo> {
        Ok(self.log.info()?)
    }

    /// Every achievement the configured rules can unlock
    pub fn list_achievements(&self) -> Vec<AchievementInfo> {
        self.engine.registry().catalog()
    }

    /// Every unlock record, in key order
    pub fn dump_unlocks(&self) -> CoreResult<Vec<UnlockRecord>> {
        Ok(self.store.dump_unlocks()?)
    }

    /// Every accumulator metadata row, in key order
    pub fn dump_metadata(&self) -> CoreResult<Vec<MetadataEntry>> {
        Ok(self.store.dump_metadata()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_service() -> AchievementService {
        AchievementService::with_storage(Storage::open_in_memory().unwrap(), RuleConfig::default())
    }

    fn pipeline(username: &str, id: i64, status: &str) -> Value {
        json!({
            "object_kind": "pipeline",
            "object_attributes": {"id": id, "status": status},
            "user": {"username": username}
        })
    }

    #[test]
    fn test_malformed_event_not_logged() {
        let service = create_test_service();

        let err = service
            .ingest_event("pipeline", json!({"object_kind": "pipeline"}), Some(1_000))
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedEvent(_)));
        assert_eq!(service.event_log_info().unwrap().count, 0);
    }

    #[test]
    fn test_unknown_kind_logged_but_not_evaluated() {
        let service = create_test_service();
        let body = json!({"object_kind": "wiki_page", "user": {"username": "alice"}});

        let err = service.ingest_event("wiki_page", body.clone(), Some(1_000)).unwrap_err();
        assert!(matches!(err, CoreError::UnknownEventKind(ref k) if k == "wiki_page"));

        let err = service.ingest_event("deployment", json!({"x": 1}), Some(2_000)).unwrap_err();
        assert!(matches!(err, CoreError::UnknownEventKind(_)));

        assert_eq!(service.event_log_info().unwrap().count, 2);
        assert!(service.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_kind_not_logged_when_disabled() {
        let service = create_test_service().with_log_unknown_events(false);

        service.ingest_event("issue", json!({}), Some(1_000)).unwrap_err();
        assert_eq!(service.event_log_info().unwrap().count, 0);
    }

    #[test]
    fn test_duplicate_body_not_reevaluated() {
        let service = create_test_service();

        let first = service.ingest_event("pipeline", pipeline("bob", 1, "failed"), Some(1_000)).unwrap();
        assert!(first.accepted);
        assert_eq!(first.sequence, Some(1));

        let second = service.ingest_event("pipeline", pipeline("bob", 1, "failed"), Some(2_000)).unwrap();
        assert!(!second.accepted);
        assert_eq!(second.sequence, None);

        let metadata = service.dump_metadata().unwrap();
        let failures = metadata
            .iter()
            .find(|m| m.achievement == "Not your day")
            .unwrap();
        assert_eq!(failures.value, json!({"pipelines": {"1970-01-01": 1}}));
    }

    #[test]
    fn test_get_user_embeds_achievements() {
        let service = create_test_service();

        service.ingest_event("pipeline", pipeline("carol", 1, "success"), Some(1_000)).unwrap();
        let outcome = service
            .ingest_event("pipeline", pipeline("carol", 2, "success"), Some(2_000))
            .unwrap();
        assert_eq!(outcome.unlocks.len(), 1);

        let user_id = outcome.unlocks[0].user_id.clone();
        let profile = service.get_user(user_id.as_str()).unwrap().unwrap();
        assert_eq!(profile.user.username.as_deref(), Some("carol"));
        assert_eq!(profile.achievements.len(), 1);
        assert_eq!(profile.achievements[0].name, "On a roll");
        assert_eq!(profile.achievements[0].timestamp, 2_000);

        assert!(service.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn test_out_of_order_hints_evaluated_in_log_order() {
        let service = create_test_service();

        service.ingest_event("pipeline", pipeline("zoe", 1, "success"), Some(2_000)).unwrap();
        let failed = service
            .ingest_event("pipeline", pipeline("zoe", 2, "failed"), Some(1_000))
            .unwrap();
        assert_eq!(failed.ingest_timestamp, 2_000);
        service.ingest_event("pipeline", pipeline("zoe", 3, "success"), Some(3_000)).unwrap();

        let live_unlocks = service.dump_unlocks().unwrap();
        let live_metadata = service.dump_metadata().unwrap();
        assert!(live_unlocks.is_empty());

        service.rebuild().unwrap();
        assert_eq!(service.dump_unlocks().unwrap(), live_unlocks);
        assert_eq!(service.dump_metadata().unwrap(), live_metadata);
    }

    #[test]
    fn test_list_achievements() {
        let catalog = create_test_service().list_achievements();
        assert!(catalog.iter().any(|a| a.name == "First blood"));
        assert!(catalog.iter().any(|a| a.name == "Flawless" && a.event_kind == "pipeline"));
    }
}
