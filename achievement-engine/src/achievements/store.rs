//! Achievement State Store
//!
//! Unlock records and accumulator metadata, both keyed by
//! `(user_id, achievement)`.

use redb::{ReadableTable, WriteTransaction};
use serde_json::Value;
use shared::models::{UnlockRecord, UnlockedAchievement, UserId};

use crate::storage::{METADATA_TABLE, Storage, StorageResult, UNLOCKS_TABLE};

/// Accumulator metadata row
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub user_id: UserId,
    pub achievement: String,
    pub value: Value,
}

/// Durable per-user unlocks and progress
#[derive(Debug, Clone)]
pub struct AchievementStore {
    storage: Storage,
}

impl AchievementStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ========== Unlocks ==========

    pub fn has_unlocked_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        achievement: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(UNLOCKS_TABLE)?;
        Ok(table.get((user_id.as_str(), achievement))?.is_some())
    }

    pub fn has_unlocked(&self, user_id: &UserId, achievement: &str) -> StorageResult<bool> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(UNLOCKS_TABLE)?;
        Ok(table.get((user_id.as_str(), achievement))?.is_some())
    }

    /// Insert the unlock record only if absent
    ///
    /// Returns whether this call created it. The check and the insert run in
    /// the same write transaction, and redb admits one writer at a time.
    pub fn unlock_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        achievement: &str,
        timestamp: i64,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(UNLOCKS_TABLE)?;
        let key = (user_id.as_str(), achievement);
        if table.get(key)?.is_some() {
            return Ok(false);
        }
        table.insert(key, timestamp)?;
        Ok(true)
    }

    /// Unlock in its own transaction
    pub fn unlock(&self, user_id: &UserId, achievement: &str, timestamp: i64) -> StorageResult<bool> {
        let txn = self.storage.begin_write()?;
        let applied = self.unlock_txn(&txn, user_id, achievement, timestamp)?;
        txn.commit()?;
        Ok(applied)
    }

    /// Unlocked achievements of one user, by name
    pub fn unlocks_for_user(&self, user_id: &UserId) -> StorageResult<Vec<UnlockedAchievement>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(UNLOCKS_TABLE)?;

        let mut unlocked = Vec::new();
        for result in table.range((user_id.as_str(), "")..)? {
            let (key, value) = result?;
            let (owner, name) = key.value();
            if owner != user_id.as_str() {
                break;
            }
            unlocked.push(UnlockedAchievement {
                name: name.to_string(),
                timestamp: value.value(),
            });
        }
        Ok(unlocked)
    }

    /// Every unlock record in key order
    pub fn dump_unlocks(&self) -> StorageResult<Vec<UnlockRecord>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(UNLOCKS_TABLE)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let (user_id, achievement) = key.value();
            records.push(UnlockRecord {
                user_id: UserId::from(user_id),
                achievement: achievement.to_string(),
                timestamp: value.value(),
            });
        }
        Ok(records)
    }

    // ========== Metadata ==========

    pub fn get_metadata_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        achievement: &str,
    ) -> StorageResult<Option<Value>> {
        let table = txn.open_table(METADATA_TABLE)?;
        match table.get((user_id.as_str(), achievement))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_metadata(&self, user_id: &UserId, achievement: &str) -> StorageResult<Option<Value>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;
        match table.get((user_id.as_str(), achievement))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn set_metadata_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        achievement: &str,
        value: &Value,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)?;
        txn.open_table(METADATA_TABLE)?
            .insert((user_id.as_str(), achievement), bytes.as_slice())?;
        Ok(())
    }

    pub fn clear_metadata_txn(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        achievement: &str,
    ) -> StorageResult<()> {
        txn.open_table(METADATA_TABLE)?
            .remove((user_id.as_str(), achievement))?;
        Ok(())
    }

    /// Every metadata row in key order
    pub fn dump_metadata(&self) -> StorageResult<Vec<MetadataEntry>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let (user_id, achievement) = key.value();
            entries.push(MetadataEntry {
                user_id: UserId::from(user_id),
                achievement: achievement.to_string(),
                value: serde_json::from_slice(value.value())?,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_store() -> (Storage, AchievementStore) {
        let storage = Storage::open_in_memory().unwrap();
        let store = AchievementStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let (_storage, store) = create_test_store();
        let alice = UserId::from("alice");

        assert!(store.unlock(&alice, "First blood", 1_000).unwrap());
        assert!(!store.unlock(&alice, "First blood", 2_000).unwrap());

        let unlocks = store.dump_unlocks().unwrap();
        assert_eq!(unlocks.len(), 1);
        assert_eq!(unlocks[0].timestamp, 1_000);
        assert!(store.has_unlocked(&alice, "First blood").unwrap());
    }

    #[test]
    fn test_unlocks_for_user() {
        let (_storage, store) = create_test_store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        store.unlock(&alice, "First blood", 1).unwrap();
        store.unlock(&bob, "Not your day", 2).unwrap();
        store.unlock(&alice, "On a roll", 3).unwrap();
        // ids sharing a prefix sort right around alice
        store.unlock(&UserId::from("al"), "Flawless", 4).unwrap();
        store.unlock(&UserId::from("alicea"), "Steady hands", 5).unwrap();

        let names = |user: &UserId| -> Vec<String> {
            store
                .unlocks_for_user(user)
                .unwrap()
                .into_iter()
                .map(|u| u.name)
                .collect()
        };
        assert_eq!(names(&alice), vec!["First blood", "On a roll"]);
        assert_eq!(names(&bob), vec!["Not your day"]);
        assert!(names(&UserId::from("carol")).is_empty());
    }

    #[test]
    fn test_metadata_lifecycle() {
        let (storage, store) = create_test_store();
        let bob = UserId::from("bob");

        let txn = storage.begin_write().unwrap();
        assert_eq!(store.get_metadata_txn(&txn, &bob, "Not your day").unwrap(), None);
        store
            .set_metadata_txn(&txn, &bob, "Not your day", &json!({"pipelines": {"2024-01-05": 3}}))
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(
            store.get_metadata(&bob, "Not your day").unwrap(),
            Some(json!({"pipelines": {"2024-01-05": 3}}))
        );

        let txn = storage.begin_write().unwrap();
        store.clear_metadata_txn(&txn, &bob, "Not your day").unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get_metadata(&bob, "Not your day").unwrap(), None);
        assert!(store.dump_metadata().unwrap().is_empty());
    }
}
