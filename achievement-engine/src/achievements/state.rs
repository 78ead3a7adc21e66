//! State views handed to checkers

use std::collections::BTreeMap;

use redb::WriteTransaction;
use serde_json::Value;
use shared::models::UserId;

use super::store::AchievementStore;
use super::traits::{CheckerError, CheckerResult, StateView};
use crate::storage::StorageResult;

/// Metadata overlay for one checker run
///
/// Reads fall through to the store inside the event's write transaction.
/// Writes stay staged until [`StagedState::flush`], so a checker that fails
/// halfway leaves no partial metadata behind.
pub struct StagedState<'a> {
    store: &'a AchievementStore,
    txn: &'a WriteTransaction,
    scope: &'a [UserId],
    /// `None` marks a cleared entry
    writes: BTreeMap<(UserId, String), Option<Value>>,
}

impl<'a> StagedState<'a> {
    pub fn new(store: &'a AchievementStore, txn: &'a WriteTransaction, scope: &'a [UserId]) -> Self {
        Self {
            store,
            txn,
            scope,
            writes: BTreeMap::new(),
        }
    }

    fn check_scope(&self, user_id: &UserId) -> CheckerResult<()> {
        if self.scope.contains(user_id) {
            Ok(())
        } else {
            Err(CheckerError::OutOfScope(user_id.clone()))
        }
    }

    /// Write staged metadata changes into the transaction
    pub fn flush(self) -> StorageResult<()> {
        for ((user_id, achievement), value) in self.writes {
            match value {
                Some(value) => self
                    .store
                    .set_metadata_txn(self.txn, &user_id, &achievement, &value)?,
                None => self.store.clear_metadata_txn(self.txn, &user_id, &achievement)?,
            }
        }
        Ok(())
    }
}

impl StateView for StagedState<'_> {
    fn has_unlocked(&self, user_id: &UserId, achievement: &str) -> CheckerResult<bool> {
        self.check_scope(user_id)?;
        Ok(self.store.has_unlocked_txn(self.txn, user_id, achievement)?)
    }

    fn get_metadata(&self, user_id: &UserId, achievement: &str) -> CheckerResult<Option<Value>> {
        self.check_scope(user_id)?;
        if let Some(staged) = self.writes.get(&(user_id.clone(), achievement.to_string())) {
            return Ok(staged.clone());
        }
        Ok(self.store.get_metadata_txn(self.txn, user_id, achievement)?)
    }

    fn set_metadata(
        &mut self,
        user_id: &UserId,
        achievement: &str,
        value: Value,
    ) -> CheckerResult<()> {
        self.check_scope(user_id)?;
        self.writes
            .insert((user_id.clone(), achievement.to_string()), Some(value));
        Ok(())
    }

    fn clear_metadata(&mut self, user_id: &UserId, achievement: &str) -> CheckerResult<()> {
        self.check_scope(user_id)?;
        self.writes
            .insert((user_id.clone(), achievement.to_string()), None);
        Ok(())
    }
}

/// In-memory state for checker tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub unlocked: std::collections::BTreeSet<(UserId, String)>,
    pub metadata: BTreeMap<(UserId, String), Value>,
}

#[cfg(test)]
impl MemoryState {
    /// Record proposals as applied unlocks
    pub fn apply(&mut self, proposals: &[super::traits::UnlockProposal]) {
        for proposal in proposals {
            self.unlocked
                .insert((proposal.user_id.clone(), proposal.achievement.clone()));
        }
    }

    pub fn metadata_of(&self, user_id: &UserId, achievement: &str) -> Option<&Value> {
        self.metadata.get(&(user_id.clone(), achievement.to_string()))
    }
}

#[cfg(test)]
impl StateView for MemoryState {
    fn has_unlocked(&self, user_id: &UserId, achievement: &str) -> CheckerResult<bool> {
        Ok(self
            .unlocked
            .contains(&(user_id.clone(), achievement.to_string())))
    }

    fn get_metadata(&self, user_id: &UserId, achievement: &str) -> CheckerResult<Option<Value>> {
        Ok(self.metadata_of(user_id, achievement).cloned())
    }

    fn set_metadata(
        &mut self,
        user_id: &UserId,
        achievement: &str,
        value: Value,
    ) -> CheckerResult<()> {
        self.metadata
            .insert((user_id.clone(), achievement.to_string()), value);
        Ok(())
    }

    fn clear_metadata(&mut self, user_id: &UserId, achievement: &str) -> CheckerResult<()> {
        self.metadata.remove(&(user_id.clone(), achievement.to_string()));
        Ok(())
    }
}
