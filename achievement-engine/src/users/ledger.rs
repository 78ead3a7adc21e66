//! User Ledger
//!
//! Merges identity fragments into one persistent record per real-world user.
//!
//! Matching tries the platform id, then the username, then the email; the
//! first hit wins. A matched user is only ever back-filled: fields already
//! populated are never overwritten, and a value already indexed to another
//! user is left alone.
//!
//! User ids are UUID v5 over the key that created the record, so rebuilding
//! the ledger from the same event sequence yields the same ids.

use redb::{ReadableTable, WriteTransaction};
use shared::models::{UserId, UserRecord};
use shared::webhook::IdentityFragment;
use uuid::Uuid;

use crate::storage::{
    Storage, StorageError, StorageResult, USERS_BY_EMAIL_TABLE, USERS_BY_ID_TABLE,
    USERS_BY_USERNAME_TABLE, USERS_TABLE,
};

/// Namespace for deterministic user ids
const USER_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d0a_8e51_c2f0_7d3b_9a14);

/// Identity index a fragment can be matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKey<'a> {
    Id(i64),
    Username(&'a str),
    Email(&'a str),
}

impl MatchKey<'_> {
    fn seed(&self) -> String {
        match self {
            MatchKey::Id(id) => format!("id:{}", id),
            MatchKey::Username(username) => format!("username:{}", username),
            MatchKey::Email(email) => format!("email:{}", email),
        }
    }
}

/// Match keys of a fragment in priority order
fn match_keys(fragment: &IdentityFragment) -> Vec<MatchKey<'_>> {
    let mut keys = Vec::with_capacity(3);
    if let Some(id) = fragment.id {
        keys.push(MatchKey::Id(id));
    }
    if let Some(username) = fragment.username.as_deref() {
        keys.push(MatchKey::Username(username));
    }
    if let Some(email) = fragment.email.as_deref() {
        keys.push(MatchKey::Email(email));
    }
    keys
}

/// Durable store of canonical users
#[derive(Debug, Clone)]
pub struct UserLedger {
    storage: Storage,
}

impl UserLedger {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    // ========== Resolution ==========

    /// Resolve a fragment to a user, creating or back-filling as needed
    pub fn lookup_or_create_txn(
        &self,
        txn: &WriteTransaction,
        fragment: &IdentityFragment,
    ) -> StorageResult<UserId> {
        let keys = match_keys(fragment);
        let Some(first_key) = keys.first().copied() else {
            return Err(StorageError::UnmatchableIdentity);
        };

        for key in &keys {
            if let Some(user_id) = self.find_by_key(txn, *key)? {
                self.backfill(txn, &user_id, fragment)?;
                return Ok(user_id);
            }
        }

        self.create(txn, first_key, fragment)
    }

    /// Resolve a fragment in its own transaction
    pub fn lookup_or_create(&self, fragment: &IdentityFragment) -> StorageResult<UserId> {
        let txn = self.storage.begin_write()?;
        let user_id = self.lookup_or_create_txn(&txn, fragment)?;
        txn.commit()?;
        Ok(user_id)
    }

    fn find_by_key(&self, txn: &WriteTransaction, key: MatchKey<'_>) -> StorageResult<Option<UserId>> {
        let found = match key {
            MatchKey::Id(id) => txn
                .open_table(USERS_BY_ID_TABLE)?
                .get(id)?
                .map(|guard| UserId::from(guard.value())),
            MatchKey::Username(username) => txn
                .open_table(USERS_BY_USERNAME_TABLE)?
                .get(username)?
                .map(|guard| UserId::from(guard.value())),
            MatchKey::Email(email) => txn
                .open_table(USERS_BY_EMAIL_TABLE)?
                .get(email)?
                .map(|guard| UserId::from(guard.value())),
        };
        Ok(found)
    }

    fn create(
        &self,
        txn: &WriteTransaction,
        key: MatchKey<'_>,
        fragment: &IdentityFragment,
    ) -> StorageResult<UserId> {
        let user_id = self.allocate_id(txn, &key.seed())?;
        let record = UserRecord {
            user_id: user_id.clone(),
            id: fragment.id,
            username: fragment.username.clone(),
            email: fragment.email.clone(),
            display_name: fragment.display_name.clone(),
            avatar_url: fragment.avatar_url.clone(),
        };

        // No key matched, so none of these index entries exist yet
        if let Some(id) = record.id {
            txn.open_table(USERS_BY_ID_TABLE)?.insert(id, user_id.as_str())?;
        }
        if let Some(username) = record.username.as_deref() {
            txn.open_table(USERS_BY_USERNAME_TABLE)?
                .insert(username, user_id.as_str())?;
        }
        if let Some(email) = record.email.as_deref() {
            txn.open_table(USERS_BY_EMAIL_TABLE)?
                .insert(email, user_id.as_str())?;
        }
        self.put_txn(txn, &record)?;

        tracing::info!(user_id = %user_id, identity = %fragment.label(), "User created");
        Ok(user_id)
    }

    /// Derive the id for a new user, stepping past any id already taken
    fn allocate_id(&self, txn: &WriteTransaction, seed: &str) -> StorageResult<UserId> {
        let users = txn.open_table(USERS_TABLE)?;
        let mut candidate = Uuid::new_v5(&USER_NAMESPACE, seed.as_bytes()).to_string();
        let mut attempt = 0u32;
        while users.get(candidate.as_str())?.is_some() {
            attempt += 1;
            let salted = format!("{}#{}", seed, attempt);
            candidate = Uuid::new_v5(&USER_NAMESPACE, salted.as_bytes()).to_string();
        }
        Ok(UserId::new(candidate))
    }

    /// Fill null fields of a matched user from the fragment
    fn backfill(
        &self,
        txn: &WriteTransaction,
        user_id: &UserId,
        fragment: &IdentityFragment,
    ) -> StorageResult<()> {
        let mut record = self
            .get_txn(txn, user_id.as_str())?
            .ok_or_else(|| StorageError::DanglingIndex(user_id.to_string()))?;
        let mut changed = false;

        if record.id.is_none()
            && let Some(id) = fragment.id
        {
            let mut index = txn.open_table(USERS_BY_ID_TABLE)?;
            let owner = index.get(id)?.map(|guard| guard.value().to_string());
            match owner {
                Some(owner) => {
                    tracing::warn!(user_id = %user_id, owner = %owner, id, "Platform id already owned by another user");
                }
                None => {
                    index.insert(id, user_id.as_str())?;
                    record.id = Some(id);
                    changed = true;
                }
            }
        }

        if record.username.is_none()
            && let Some(username) = fragment.username.as_deref()
        {
            let mut index = txn.open_table(USERS_BY_USERNAME_TABLE)?;
            let owner = index.get(username)?.map(|guard| guard.value().to_string());
            match owner {
                Some(owner) => {
                    tracing::warn!(user_id = %user_id, owner = %owner, username, "Username already owned by another user");
                }
                None => {
                    index.insert(username, user_id.as_str())?;
                    record.username = Some(username.to_string());
                    changed = true;
                }
            }
        }

        if record.email.is_none()
            && let Some(email) = fragment.email.as_deref()
        {
            let mut index = txn.open_table(USERS_BY_EMAIL_TABLE)?;
            let owner = index.get(email)?.map(|guard| guard.value().to_string());
            match owner {
                Some(owner) => {
                    tracing::warn!(user_id = %user_id, owner = %owner, "Email already owned by another user");
                }
                None => {
                    index.insert(email, user_id.as_str())?;
                    record.email = Some(email.to_string());
                    changed = true;
                }
            }
        }

        if record.display_name.is_none() && fragment.display_name.is_some() {
            record.display_name = fragment.display_name.clone();
            changed = true;
        }
        if record.avatar_url.is_none() && fragment.avatar_url.is_some() {
            record.avatar_url = fragment.avatar_url.clone();
            changed = true;
        }

        if changed {
            self.put_txn(txn, &record)?;
            tracing::debug!(user_id = %user_id, "User identity back-filled");
        }
        Ok(())
    }

    fn put_txn(&self, txn: &WriteTransaction, record: &UserRecord) -> StorageResult<()> {
        let value = serde_json::to_vec(record)?;
        txn.open_table(USERS_TABLE)?
            .insert(record.user_id.as_str(), value.as_slice())?;
        Ok(())
    }

    // ========== Read ==========

    pub fn get_txn(&self, txn: &WriteTransaction, user_id: &str) -> StorageResult<Option<UserRecord>> {
        let table = txn.open_table(USERS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, user_id: &str) -> StorageResult<Option<UserRecord>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(USERS_TABLE)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All users, in user id order
    pub fn list_all(&self) -> StorageResult<Vec<UserRecord>> {
        let read_txn = self.storage.begin_read()?;
        let table = read_txn.open_table(USERS_TABLE)?;

        let mut users = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }
}
