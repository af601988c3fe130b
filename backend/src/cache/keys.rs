use chrono::NaiveDate;

use crate::constants::{LIKES_COUNT_INDEX, LIKES_PROFILES_INDEX, MATCH_PROFILES_INDEX};
use crate::models::UserId;

/// Builds the per-user index keys, e.g. `matchmaker:user:42:likes:count:2025-05-01`.
/// Daily indexes carry their local date so a write for one day can never
/// land in the next day's key.
#[derive(Debug, Clone)]
pub struct IndexKeys {
    prefix: String,
}

impl IndexKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn key(&self, user_id: UserId, index: &str) -> String {
        format!("{}:user:{}:{}", self.prefix, user_id, index)
    }

    pub fn likes_count(&self, user_id: UserId, date: NaiveDate) -> String {
        format!("{}:{}", self.key(user_id, LIKES_COUNT_INDEX), date)
    }

    pub fn liked_profiles(&self, user_id: UserId, date: NaiveDate) -> String {
        format!("{}:{}", self.key(user_id, LIKES_PROFILES_INDEX), date)
    }

    pub fn matched_profiles(&self, user_id: UserId) -> String {
        self.key(user_id, MATCH_PROFILES_INDEX)
    }

    /// Keys for `date`'s daily indexes plus the matched index.
    pub fn all(&self, user_id: UserId, date: NaiveDate) -> [String; 3] {
        [
            self.likes_count(user_id, date),
            self.liked_profiles(user_id, date),
            self.matched_profiles(user_id),
        ]
    }
}
