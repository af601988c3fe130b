use std::sync::Arc;

use chrono_tz::Tz;
use mockable::Clock;
use tracing::{debug, info};

use crate::cache::{ProfileIndexCache, ttl::local_date};
use crate::constants::DAILY_LIKE_QUOTA;
use crate::db::{SwipeLog, UserDirectory};
use crate::error::StoreError;
use crate::models::{Action, NewSwipe, Outcome, UserId};

/// Records one swipe and classifies its outcome.
pub struct MatchEngine {
    users: Arc<dyn UserDirectory>,
    log: Arc<dyn SwipeLog>,
    index: Arc<ProfileIndexCache>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    daily_like_quota: i64,
}

impl MatchEngine {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        log: Arc<dyn SwipeLog>,
        index: Arc<ProfileIndexCache>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            users,
            log,
            index,
            clock,
            timezone,
            daily_like_quota: DAILY_LIKE_QUOTA,
        }
    }

    pub fn with_daily_like_quota(mut self, quota: i64) -> Self {
        self.daily_like_quota = quota;
        self
    }

    /// Records `acting_user`'s decision about `target_user`.
    ///
    /// Unknown targets yield [`Outcome::NotFound`] and a used-up quota
    /// [`Outcome::LimitReached`], both without touching the log or the
    /// cache. Indexes are updated only after the log write commits.
    pub async fn record_swipe(
        &self,
        acting_user: UserId,
        target_user: UserId,
        action: Action,
    ) -> Result<Outcome, StoreError> {
        if acting_user == target_user || !self.users.exists(target_user).await? {
            debug!(acting_user, target_user, "swipe target not found");
            return Ok(Outcome::NotFound);
        }

        let likes_today = self.index.get_count(acting_user).await?;
        if likes_today >= self.daily_like_quota && !self.users.is_premium(acting_user).await? {
            info!(acting_user, likes_today, "daily like quota reached");
            return Ok(Outcome::LimitReached);
        }

        let now = self.clock.utc();
        let write = self
            .log
            .apply_swipe(NewSwipe {
                user_id: acting_user,
                target_id: target_user,
                swipe_date: local_date(now, self.timezone),
                action,
                created_at: now,
            })
            .await?;

        let outcome = write.outcome();

        if !write.inserted {
            debug!(
                acting_user,
                target_user,
                stored = %write.record.action,
                requested = %action,
                "already swiped today, keeping the first decision"
            );
            return Ok(outcome);
        }

        if action.is_like() {
            let day = write.record.swipe_date;
            self.index.increment_count(acting_user, day).await;
            self.index.add_liked(acting_user, target_user, day).await;
        }

        if outcome == Outcome::Match {
            self.index.add_matched(acting_user, target_user).await;
            self.index.add_matched(target_user, acting_user).await;
        }

        info!(acting_user, target_user, %action, %outcome, "swipe recorded");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::test_support::{Harness, harness};

    #[tokio::test]
    async fn likes_under_quota_are_counted() {
        let h = harness(12).await;
        for target in 2..=11 {
            let outcome = h.engine.record_swipe(1, target, Action::Like).await.unwrap();
            assert_eq!(outcome, Outcome::NoLike);
        }
        assert_eq!(h.index.get_count(1).await.unwrap(), 10);
        assert_eq!(h.index.get_liked_today(1).await.unwrap(), (2..=11).collect::<BTreeSet<_>>());
    }

    #[tokio::test]
    async fn eleventh_like_hits_the_quota() {
        let h = harness(13).await;
        for target in 2..=11 {
            h.engine.record_swipe(1, target, Action::Like).await.unwrap();
        }

        let outcome = h.engine.record_swipe(1, 12, Action::Like).await.unwrap();
        assert_eq!(outcome, Outcome::LimitReached);
        assert_eq!(h.index.get_count(1).await.unwrap(), 10);
        assert_eq!(h.log.rows().await.len(), 10);

        let pass = h.engine.record_swipe(1, 13, Action::Pass).await.unwrap();
        assert_eq!(pass, Outcome::LimitReached);
        assert_eq!(h.log.rows().await.len(), 10);
    }

    #[tokio::test]
    async fn quota_resets_at_midnight() {
        let h = harness(13).await;
        for target in 2..=11 {
            h.engine.record_swipe(1, target, Action::Like).await.unwrap();
        }
        assert_eq!(h.engine.record_swipe(1, 12, Action::Like).await.unwrap(), Outcome::LimitReached);

        h.clock.set("2025-06-02T00:00:05Z".parse().unwrap());
        assert_eq!(h.engine.record_swipe(1, 12, Action::Like).await.unwrap(), Outcome::NoLike);
        assert_eq!(h.index.get_count(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn premium_users_bypass_the_quota() {
        let h = harness(13).await;
        h.users.insert(1, "Premium", true).await;
        for target in 2..=12 {
            let outcome = h.engine.record_swipe(1, target, Action::Like).await.unwrap();
            assert_eq!(outcome, Outcome::NoLike);
        }
        assert_eq!(h.index.get_count(1).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn mutual_likes_match_symmetrically() {
        let h = harness(3).await;
        assert_eq!(h.engine.record_swipe(1, 2, Action::Like).await.unwrap(), Outcome::NoLike);
        assert_eq!(h.engine.record_swipe(2, 1, Action::Like).await.unwrap(), Outcome::Match);

        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([2]));
        assert_eq!(h.index.get_matched(2).await.unwrap(), BTreeSet::from([1]));
        assert!(h.log.rows().await.iter().all(|r| r.is_matched));
    }

    #[tokio::test]
    async fn passing_on_an_admirer_is_missed() {
        let h = harness(3).await;
        h.engine.record_swipe(1, 2, Action::Like).await.unwrap();

        let outcome = h.engine.record_swipe(2, 1, Action::Pass).await.unwrap();
        assert_eq!(outcome, Outcome::Missed);

        let rows = h.log.rows().await;
        assert!(rows.iter().all(|r| !r.is_matched));
        assert!(h.index.get_matched(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn superlike_answering_a_like_matches_both_indexes() {
        let h = harness(4).await;
        for (from, to) in [(1, 3), (3, 1), (2, 4), (4, 2)] {
            h.engine.record_swipe(from, to, Action::Like).await.unwrap();
        }
        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([3]));
        assert_eq!(h.index.get_matched(2).await.unwrap(), BTreeSet::from([4]));

        h.engine.record_swipe(1, 2, Action::Like).await.unwrap();
        let outcome = h.engine.record_swipe(2, 1, Action::SuperLike).await.unwrap();
        assert_eq!(outcome, Outcome::Match);

        let pair = h.log.rows().await;
        assert!(
            pair.iter()
                .filter(|r| (r.user_id, r.target_id) == (1, 2) || (r.user_id, r.target_id) == (2, 1))
                .all(|r| !r.is_matched)
        );
        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([2, 3]));
        assert_eq!(h.index.get_matched(2).await.unwrap(), BTreeSet::from([1, 4]));

        h.cache.clear().await;
        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([2, 3]));
        assert_eq!(h.index.get_matched(2).await.unwrap(), BTreeSet::from([1, 4]));
    }

    #[tokio::test]
    async fn like_answering_a_superlike_is_no_like() {
        let h = harness(3).await;
        h.engine.record_swipe(1, 2, Action::SuperLike).await.unwrap();
        let outcome = h.engine.record_swipe(2, 1, Action::Like).await.unwrap();
        assert_eq!(outcome, Outcome::NoLike);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found_and_changes_nothing() {
        let h = harness(3).await;
        h.engine.record_swipe(1, 2, Action::Like).await.unwrap();

        assert_eq!(h.engine.record_swipe(1, 404, Action::Like).await.unwrap(), Outcome::NotFound);
        assert_eq!(h.engine.record_swipe(1, 1, Action::Like).await.unwrap(), Outcome::NotFound);

        assert_eq!(h.index.get_count(1).await.unwrap(), 1);
        assert_eq!(h.index.get_liked_today(1).await.unwrap(), BTreeSet::from([2]));
        assert_eq!(h.log.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn repeat_swipe_is_not_counted_twice() {
        let h = harness(3).await;
        h.engine.record_swipe(1, 2, Action::Like).await.unwrap();
        let again = h.engine.record_swipe(1, 2, Action::Like).await.unwrap();

        assert_eq!(again, Outcome::NoLike);
        assert_eq!(h.index.get_count(1).await.unwrap(), 1);
        assert_eq!(h.log.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn store_failure_aborts_without_cache_mutation() {
        let h = harness(3).await;
        assert_eq!(h.index.get_count(1).await.unwrap(), 0);
        h.log.set_unavailable(true);

        let err = h.engine.record_swipe(1, 2, Action::Like).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        h.log.set_unavailable(false);
        assert_eq!(h.index.get_count(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cache_outage_does_not_fail_swipes() {
        let h = harness(3).await;
        h.cache.set_unavailable(true);

        assert_eq!(h.engine.record_swipe(1, 2, Action::Like).await.unwrap(), Outcome::NoLike);
        assert_eq!(h.engine.record_swipe(2, 1, Action::Like).await.unwrap(), Outcome::Match);

        h.cache.set_unavailable(false);
        assert_eq!(h.index.get_count(1).await.unwrap(), 1);
        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([2]));
    }

    #[tokio::test]
    async fn concurrent_mutual_likes_match_once() {
        let Harness { engine, log, .. } = harness(3).await;

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.record_swipe(1, 2, Action::Like).await.unwrap() }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.record_swipe(2, 1, Action::Like).await.unwrap() }
        });

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Match).count(), 1);
        assert!(log.rows().await.iter().all(|r| r.is_matched));
    }

    #[tokio::test]
    async fn incremental_indexes_equal_a_rebuild() {
        let h = harness(7).await;
        for (from, to, action) in [
            (1, 2, Action::Like),
            (2, 1, Action::Like),
            (1, 3, Action::SuperLike),
            (3, 1, Action::Like),
            (1, 4, Action::Pass),
            (4, 1, Action::Like),
            (5, 1, Action::Like),
            (1, 5, Action::Like),
            (6, 1, Action::Like),
            (1, 6, Action::SuperLike),
        ] {
            // reading between swipes keeps every index warm
            h.index.snapshot(from).await.unwrap();
            h.index.snapshot(to).await.unwrap();
            h.engine.record_swipe(from, to, action).await.unwrap();
        }

        let mut incremental = Vec::new();
        for user in 1..=6 {
            incremental.push(h.index.snapshot(user).await.unwrap());
        }

        h.cache.clear().await;
        for (user, expected) in (1..=6).zip(incremental) {
            let rebuilt = h.index.snapshot(user).await.unwrap();
            assert_eq!(expected, rebuilt, "user {user}");
        }
        assert_eq!(h.index.get_matched(1).await.unwrap(), BTreeSet::from([2, 5, 6]));
        assert_eq!(h.index.get_matched(6).await.unwrap(), BTreeSet::from([1]));
    }
}
