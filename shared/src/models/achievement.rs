//! Achievement Model

use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Durable unlock record, unique per (user, achievement)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub user_id: UserId,
    pub achievement: String,
    /// Unix millis (ingest timestamp of the unlocking event)
    pub timestamp: i64,
}

/// Unlocked achievement as embedded in a user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub name: String,
    pub timestamp: i64,
}

/// Catalog entry describing an achievement a rule can unlock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementInfo {
    pub name: String,
    pub description: String,
    pub event_kind: String,
}
