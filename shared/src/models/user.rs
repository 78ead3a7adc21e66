//! User Model

use serde::{Deserialize, Serialize};

use super::achievement::UnlockedAchievement;

/// Stable opaque user identifier (UUID string), generated once and never reused
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Canonical user (用户)
///
/// Identity fields are independently nullable and only ever filled in,
/// never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Platform numeric user id
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserRecord {
    /// Copy with the email removed, for external exposure
    pub fn without_email(&self) -> Self {
        Self {
            email: None,
            ..self.clone()
        }
    }
}

/// User with unlocked achievements embedded (for detail views)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserRecord,
    pub achievements: Vec<UnlockedAchievement>,
}
