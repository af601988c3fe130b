use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use super::swipes::{SwipeLog, completed_by_superlike, matches_on_insert};
use super::users::UserDirectory;
use crate::error::StoreError;
use crate::models::{Action, NewSwipe, Profile, SwipeRecord, SwipeWrite, UserId};

#[derive(Debug, Default)]
struct LogState {
    rows: Vec<SwipeRecord>,
    next_id: i64,
}

/// Swipe log held in memory. A single lock makes every write atomic.
#[derive(Debug, Default)]
pub struct MemorySwipeLog {
    state: Mutex<LogState>,
    unavailable: AtomicBool,
}

impl MemorySwipeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn rows(&self) -> Vec<SwipeRecord> {
        self.state.lock().await.rows.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory swipe log switched off".to_string()));
        }
        Ok(())
    }
}

fn liked_on(row: &SwipeRecord, user_id: UserId, date: NaiveDate) -> bool {
    row.user_id == user_id && row.swipe_date == date && row.action.is_like()
}

#[async_trait]
impl SwipeLog for MemorySwipeLog {
    async fn count_likes_on(&self, user_id: UserId, date: NaiveDate) -> Result<i64, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let count = state.rows.iter().filter(|r| liked_on(r, user_id, date)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn liked_targets_on(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<UserId>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .rows
            .iter()
            .filter(|r| liked_on(r, user_id, date))
            .map(|r| r.target_id)
            .collect())
    }

    async fn matched_targets(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let targets: BTreeSet<UserId> = state
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| r.is_matched || state.rows.iter().any(|other| completed_by_superlike(r, other)))
            .map(|r| r.target_id)
            .collect();
        Ok(targets.into_iter().collect())
    }

    async fn swipes_for(&self, user_id: UserId, date: Option<NaiveDate>) -> Result<Vec<SwipeRecord>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && date.is_none_or(|d| r.swipe_date == d))
            .cloned()
            .collect())
    }

    async fn apply_swipe(&self, swipe: NewSwipe) -> Result<SwipeWrite, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let reciprocal_idx = state.rows.iter().position(|r| {
            r.user_id == swipe.target_id && r.target_id == swipe.user_id && r.action == Action::Like
        });

        let existing = state.rows.iter().find(|r| {
            r.user_id == swipe.user_id
                && r.target_id == swipe.target_id
                && r.swipe_date == swipe.swipe_date
        });
        if let Some(existing) = existing {
            return Ok(SwipeWrite {
                record: existing.clone(),
                reciprocal: reciprocal_idx.and_then(|i| state.rows.get(i).cloned()),
                inserted: false,
            });
        }

        let is_matched = matches_on_insert(swipe.action, reciprocal_idx.is_some());
        if is_matched {
            if let Some(pair) = reciprocal_idx.and_then(|i| state.rows.get_mut(i)) {
                pair.is_matched = true;
            }
        }

        state.next_id += 1;
        let record = SwipeRecord {
            id: state.next_id,
            user_id: swipe.user_id,
            target_id: swipe.target_id,
            swipe_date: swipe.swipe_date,
            action: swipe.action,
            created_at: swipe.created_at,
            is_matched,
        };
        state.rows.push(record.clone());

        Ok(SwipeWrite {
            record,
            reciprocal: reciprocal_idx.and_then(|i| state.rows.get(i).cloned()),
            inserted: true,
        })
    }
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    profile: Profile,
    is_premium: bool,
}

/// User directory held in memory.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: Mutex<BTreeMap<UserId, DirectoryEntry>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: UserId, name: &str, is_premium: bool) -> Profile {
        let profile = Profile {
            id,
            name: name.to_string(),
            username: Some(name.to_lowercase()),
        };
        self.users.lock().await.insert(
            id,
            DirectoryEntry {
                profile: profile.clone(),
                is_premium,
            },
        );
        profile
    }
}

fn shuffled(mut profiles: Vec<Profile>) -> Vec<Profile> {
    profiles.shuffle(&mut rand::rng());
    profiles
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.lock().await.contains_key(&user_id))
    }

    async fn is_premium(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .get(&user_id)
            .is_some_and(|entry| entry.is_premium))
    }

    async fn fetch_random(&self, exclude: &[UserId], limit: usize) -> Result<Vec<Profile>, StoreError> {
        let candidates: Vec<Profile> = self
            .users
            .lock()
            .await
            .values()
            .filter(|entry| !exclude.contains(&entry.profile.id))
            .map(|entry| entry.profile.clone())
            .collect();

        let mut picked = shuffled(candidates);
        picked.truncate(limit);
        Ok(picked)
    }
}
