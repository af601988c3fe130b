use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use mockable::Clock;
use tracing::{debug, warn};

use super::backend::CacheBackend;
use super::keys::IndexKeys;
use super::ttl::{local_date, until_next_midnight};
use crate::constants::MATCH_INDEX_TTL_SECS;
use crate::db::SwipeLog;
use crate::error::{CacheError, StoreError};
use crate::models::UserId;

/// Values of all three indexes for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub likes_today: i64,
    pub liked_today: BTreeSet<UserId>,
    pub matched: BTreeSet<UserId>,
}

/// Cached sizes of the set indexes, zero when a set is not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSizes {
    pub liked_today: u64,
    pub matched: u64,
}

/// Per-user derived indexes over the swipe log. Reads are cache-aside and
/// fall back to the log when the backend fails; writes only touch keys that
/// are already cached.
pub struct ProfileIndexCache {
    backend: Arc<dyn CacheBackend>,
    log: Arc<dyn SwipeLog>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    keys: IndexKeys,
    match_ttl: Duration,
}

impl ProfileIndexCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        log: Arc<dyn SwipeLog>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
        keys: IndexKeys,
    ) -> Self {
        Self {
            backend,
            log,
            clock,
            timezone,
            keys,
            match_ttl: Duration::from_secs(MATCH_INDEX_TTL_SECS),
        }
    }

    /// Number of Like/SuperLike swipes `user_id` made today.
    pub async fn get_count(&self, user_id: UserId) -> Result<i64, StoreError> {
        let now = self.clock.utc();
        let today = local_date(now, self.timezone);
        let key = self.keys.likes_count(user_id, today);

        match self.backend.get(&key).await {
            Ok(Some(count)) => return Ok(count),
            Ok(None) => {}
            Err(e) => {
                warn!(user_id, error = %e, "likes count cache read failed, using swipe log");
                return self.log.count_likes_on(user_id, today).await;
            }
        }

        let count = self.log.count_likes_on(user_id, today).await?;
        let ttl = until_next_midnight(now, self.timezone);

        if let Err(e) = self.backend.set_with_ttl(&key, count, ttl).await {
            warn!(user_id, error = %e, "failed to cache likes count");
        }
        debug!(user_id, count, "rebuilt likes count index");

        Ok(count)
    }

    /// Profiles `user_id` liked or super-liked today.
    pub async fn get_liked_today(&self, user_id: UserId) -> Result<BTreeSet<UserId>, StoreError> {
        let now = self.clock.utc();
        let today = local_date(now, self.timezone);
        let key = self.keys.liked_profiles(user_id, today);

        match self.read_set(&key).await {
            Ok(Some(profiles)) => return Ok(profiles),
            Ok(None) => {}
            Err(e) => {
                warn!(user_id, error = %e, "liked profiles cache read failed, using swipe log");
                return self.liked_from_log(user_id, today).await;
            }
        }

        let profiles = self.liked_from_log(user_id, today).await?;
        self.write_set(&key, &profiles, until_next_midnight(now, self.timezone))
            .await;
        debug!(user_id, size = profiles.len(), "rebuilt liked profiles index");

        Ok(profiles)
    }

    /// Profiles `user_id` is matched with.
    pub async fn get_matched(&self, user_id: UserId) -> Result<BTreeSet<UserId>, StoreError> {
        let key = self.keys.matched_profiles(user_id);

        match self.read_set(&key).await {
            Ok(Some(profiles)) => return Ok(profiles),
            Ok(None) => {}
            Err(e) => {
                warn!(user_id, error = %e, "matched profiles cache read failed, using swipe log");
                return self.matched_from_log(user_id).await;
            }
        }

        let profiles = self.matched_from_log(user_id).await?;
        self.write_set(&key, &profiles, self.match_ttl).await;
        debug!(user_id, size = profiles.len(), "rebuilt matched profiles index");

        Ok(profiles)
    }

    /// Counts one more like on `date`. No-op when that day's count is not
    /// cached.
    pub async fn increment_count(&self, user_id: UserId, date: NaiveDate) {
        let key = self.keys.likes_count(user_id, date);
        if let Err(e) = self.backend.incr_existing(&key, 1).await {
            warn!(user_id, error = %e, "failed to increment likes count");
        }
    }

    /// Records `target_id` as liked on `date`. No-op when that day's set is
    /// not cached.
    pub async fn add_liked(&self, user_id: UserId, target_id: UserId, date: NaiveDate) {
        let key = self.keys.liked_profiles(user_id, date);
        if let Err(e) = self.backend.sadd_existing(&key, &[target_id], None).await {
            warn!(user_id, target_id, error = %e, "failed to add liked profile");
        }
    }

    /// Records a match and re-arms the matched index TTL.
    pub async fn add_matched(&self, user_id: UserId, target_id: UserId) {
        let key = self.keys.matched_profiles(user_id);
        if let Err(e) = self
            .backend
            .sadd_existing(&key, &[target_id], Some(self.match_ttl))
            .await
        {
            warn!(user_id, target_id, error = %e, "failed to add matched profile");
        }
    }

    /// Drops every index of `user_id`; the next read rebuilds from the log.
    /// Earlier days' keys are left to expire.
    pub async fn invalidate(&self, user_id: UserId) -> Result<(), CacheError> {
        let today = local_date(self.clock.utc(), self.timezone);
        self.backend.del(&self.keys.all(user_id, today)).await
    }

    /// Invalidates and immediately repopulates all indexes of `user_id`.
    pub async fn rebuild(&self, user_id: UserId) -> Result<IndexSnapshot, StoreError> {
        if let Err(e) = self.invalidate(user_id).await {
            warn!(user_id, error = %e, "failed to invalidate indexes before rebuild");
        }
        self.snapshot(user_id).await
    }

    pub async fn snapshot(&self, user_id: UserId) -> Result<IndexSnapshot, StoreError> {
        Ok(IndexSnapshot {
            likes_today: self.get_count(user_id).await?,
            liked_today: self.get_liked_today(user_id).await?,
            matched: self.get_matched(user_id).await?,
        })
    }

    /// Sizes of the cached set indexes, read without touching the log.
    pub async fn cached_set_sizes(&self, user_id: UserId) -> Result<IndexSizes, CacheError> {
        let today = local_date(self.clock.utc(), self.timezone);
        Ok(IndexSizes {
            liked_today: self.backend.scard(&self.keys.liked_profiles(user_id, today)).await?,
            matched: self.backend.scard(&self.keys.matched_profiles(user_id)).await?,
        })
    }

    async fn liked_from_log(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<BTreeSet<UserId>, StoreError> {
        Ok(self.log.liked_targets_on(user_id, date).await?.into_iter().collect())
    }

    async fn matched_from_log(&self, user_id: UserId) -> Result<BTreeSet<UserId>, StoreError> {
        Ok(self.log.matched_targets(user_id).await?.into_iter().collect())
    }

    /// `None` when the key is absent. Redis drops empty sets, so an empty
    /// index is indistinguishable from a miss and is recomputed every time.
    async fn read_set(&self, key: &str) -> Result<Option<BTreeSet<UserId>>, CacheError> {
        let members = self.backend.smembers(key).await?;
        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(members.into_iter().collect()))
    }

    async fn write_set(&self, key: &str, members: &BTreeSet<UserId>, ttl: Duration) {
        let members: Vec<UserId> = members.iter().copied().collect();
        if let Err(e) = self.backend.sadd_with_ttl(key, &members, ttl).await {
            warn!(key, error = %e, "failed to populate index");
        }
    }
}
