use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::StoreError;
use crate::models::{Action, NewSwipe, SwipeRecord, SwipeWrite, UserId};

/// Durable swipe log, the source of truth every cache index is derived from.
#[async_trait]
pub trait SwipeLog: Send + Sync {
    /// Number of Like/SuperLike rows `user_id` recorded on `date`.
    async fn count_likes_on(&self, user_id: UserId, date: NaiveDate) -> Result<i64, StoreError>;

    /// Targets `user_id` liked or super-liked on `date`.
    async fn liked_targets_on(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<UserId>, StoreError>;

    /// Targets `user_id` is matched with, regardless of date: pairs whose
    /// rows are marked matched plus pairs completed by a SuperLike answering
    /// an earlier Like, which leave both rows unmarked.
    async fn matched_targets(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError>;

    /// Swipes made by `user_id`, optionally restricted to one day, oldest first.
    async fn swipes_for(&self, user_id: UserId, date: Option<NaiveDate>) -> Result<Vec<SwipeRecord>, StoreError>;

    /// Atomically looks up the reciprocal Like, stores the swipe and marks
    /// the pair matched when the new action is a Like.
    ///
    /// Swipes between the same two users are serialized, so at most one of
    /// two concurrent mutual likes observes the other. A second swipe for the
    /// same user, target and day is not stored; the existing row is returned
    /// with `inserted == false`.
    async fn apply_swipe(&self, swipe: NewSwipe) -> Result<SwipeWrite, StoreError>;
}

/// The only way a new row is born matched: a plain Like answering a Like.
pub fn matches_on_insert(action: Action, reciprocal_found: bool) -> bool {
    action == Action::Like && reciprocal_found
}

/// Whether `own` and `other` form a pair completed by a SuperLike that
/// answered an earlier Like, in either direction.
pub fn completed_by_superlike(own: &SwipeRecord, other: &SwipeRecord) -> bool {
    if own.user_id != other.target_id || own.target_id != other.user_id {
        return false;
    }
    match (own.action, other.action) {
        (Action::SuperLike, Action::Like) => other.id < own.id,
        (Action::Like, Action::SuperLike) => own.id < other.id,
        _ => false,
    }
}

/// Ordered pair used to serialize swipes between two users.
pub fn pair_lock_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b { (a, b) } else { (b, a) }
}

#[derive(Debug, FromRow)]
struct SwipeRow {
    id: i64,
    user_id: i32,
    target_id: i32,
    swipe_date: NaiveDate,
    action: i16,
    created_at: DateTime<Utc>,
    is_matched: bool,
}

impl TryFrom<SwipeRow> for SwipeRecord {
    type Error = StoreError;

    fn try_from(row: SwipeRow) -> Result<Self, Self::Error> {
        let action = Action::from_code(row.action).ok_or_else(|| StoreError::Corrupt {
            id: row.id,
            reason: format!("unknown action code {}", row.action),
        })?;

        Ok(SwipeRecord {
            id: row.id,
            user_id: row.user_id,
            target_id: row.target_id,
            swipe_date: row.swipe_date,
            action,
            created_at: row.created_at,
            is_matched: row.is_matched,
        })
    }
}

const SWIPE_COLUMNS: &str = "id, user_id, target_id, swipe_date, action, created_at, is_matched";

#[derive(Debug, Clone)]
pub struct PgSwipeLog {
    pool: PgPool,
}

impl PgSwipeLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SwipeLog for PgSwipeLog {
    async fn count_likes_on(&self, user_id: UserId, date: NaiveDate) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM swipes WHERE user_id = $1 AND swipe_date = $2 AND action IN ($3, $4)",
        )
        .bind(user_id)
        .bind(date)
        .bind(Action::Like.code())
        .bind(Action::SuperLike.code())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn liked_targets_on(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<UserId>, StoreError> {
        let targets = sqlx::query_scalar::<_, i32>(
            "SELECT target_id FROM swipes WHERE user_id = $1 AND swipe_date = $2 AND action IN ($3, $4)",
        )
        .bind(user_id)
        .bind(date)
        .bind(Action::Like.code())
        .bind(Action::SuperLike.code())
        .fetch_all(&self.pool)
        .await?;

        Ok(targets)
    }

    async fn matched_targets(&self, user_id: UserId) -> Result<Vec<UserId>, StoreError> {
        let targets = sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT s.target_id FROM swipes s \
             WHERE s.user_id = $1 AND (s.is_matched OR EXISTS ( \
                 SELECT 1 FROM swipes r \
                 WHERE r.user_id = s.target_id AND r.target_id = s.user_id \
                   AND ((s.action = $2 AND r.action = $3 AND r.id < s.id) \
                     OR (s.action = $3 AND r.action = $2 AND s.id < r.id)))) \
             ORDER BY s.target_id",
        )
        .bind(user_id)
        .bind(Action::SuperLike.code())
        .bind(Action::Like.code())
        .fetch_all(&self.pool)
        .await?;

        Ok(targets)
    }

    async fn swipes_for(&self, user_id: UserId, date: Option<NaiveDate>) -> Result<Vec<SwipeRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM swipes \
             WHERE user_id = $1 AND ($2::DATE IS NULL OR swipe_date = $2) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SwipeRecord::try_from).collect()
    }

    async fn apply_swipe(&self, swipe: NewSwipe) -> Result<SwipeWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (low, high) = pair_lock_key(swipe.user_id, swipe.target_id);
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(low)
            .bind(high)
            .execute(&mut *tx)
            .await?;

        let reciprocal = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM swipes \
             WHERE user_id = $1 AND target_id = $2 AND action = $3 \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(swipe.target_id)
        .bind(swipe.user_id)
        .bind(Action::Like.code())
        .fetch_optional(&mut *tx)
        .await?
        .map(SwipeRecord::try_from)
        .transpose()?;

        let is_matched = matches_on_insert(swipe.action, reciprocal.is_some());

        let inserted = sqlx::query_as::<_, SwipeRow>(&format!(
            "INSERT INTO swipes (user_id, target_id, swipe_date, action, created_at, is_matched) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, target_id, swipe_date) DO NOTHING \
             RETURNING {SWIPE_COLUMNS}"
        ))
        .bind(swipe.user_id)
        .bind(swipe.target_id)
        .bind(swipe.swipe_date)
        .bind(swipe.action.code())
        .bind(swipe.created_at)
        .bind(is_matched)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            let existing = sqlx::query_as::<_, SwipeRow>(&format!(
                "SELECT {SWIPE_COLUMNS} FROM swipes \
                 WHERE user_id = $1 AND target_id = $2 AND swipe_date = $3"
            ))
            .bind(swipe.user_id)
            .bind(swipe.target_id)
            .bind(swipe.swipe_date)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            return Ok(SwipeWrite {
                record: SwipeRecord::try_from(existing)?,
                reciprocal,
                inserted: false,
            });
        };

        let mut reciprocal = reciprocal;
        if is_matched {
            if let Some(pair) = reciprocal.as_mut() {
                sqlx::query("UPDATE swipes SET is_matched = TRUE WHERE id = $1")
                    .bind(pair.id)
                    .execute(&mut *tx)
                    .await?;
                pair.is_matched = true;
            }
        }

        tx.commit().await?;

        Ok(SwipeWrite {
            record: SwipeRecord::try_from(row)?,
            reciprocal,
            inserted: true,
        })
    }
}


#[cfg(all(test, feature = "postgres-tests"))]
mod pg_tests {
    use super::*;
    use crate::models::Outcome;

    async fn seed_users(pool: &PgPool, count: UserId) {
        for id in 1..=count {
            sqlx::query("INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, 'x')")
                .bind(id)
                .bind(format!("User{id}"))
                .bind(format!("user{id}@example.com"))
                .execute(pool)
                .await
                .unwrap();
        }
    }

    fn swipe(user_id: UserId, target_id: UserId, action: Action) -> NewSwipe {
        let now = Utc::now();
        NewSwipe {
            user_id,
            target_id,
            swipe_date: now.date_naive(),
            action,
            created_at: now,
        }
    }

    async fn matched_rows(pool: &PgPool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM swipes WHERE is_matched")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn mutual_likes_mark_both_rows(pool: PgPool) {
        seed_users(&pool, 2).await;
        let log = PgSwipeLog::new(pool.clone());

        let first = log.apply_swipe(swipe(1, 2, Action::Like)).await.unwrap();
        assert!(first.inserted);
        assert_eq!(first.outcome(), Outcome::NoLike);

        let second = log.apply_swipe(swipe(2, 1, Action::Like)).await.unwrap();
        assert_eq!(second.outcome(), Outcome::Match);
        assert!(second.record.is_matched);
        assert!(second.reciprocal.as_ref().is_some_and(|r| r.is_matched));

        assert_eq!(matched_rows(&pool).await, 2);
        assert_eq!(log.matched_targets(1).await.unwrap(), vec![2]);
        assert_eq!(log.matched_targets(2).await.unwrap(), vec![1]);
    }

    #[sqlx::test]
    async fn same_day_reswipe_keeps_the_first_row(pool: PgPool) {
        seed_users(&pool, 2).await;
        let log = PgSwipeLog::new(pool.clone());
        log.apply_swipe(swipe(1, 2, Action::Like)).await.unwrap();

        let again = log.apply_swipe(swipe(1, 2, Action::Pass)).await.unwrap();
        assert!(!again.inserted);
        assert_eq!(again.record.action, Action::Like);

        let rows = log.swipes_for(1, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(log.count_likes_on(1, rows[0].swipe_date).await.unwrap(), 1);
    }

    #[sqlx::test]
    async fn concurrent_mutual_likes_match_once(pool: PgPool) {
        seed_users(&pool, 2).await;
        let log = PgSwipeLog::new(pool.clone());

        let (a, b) = tokio::join!(
            log.apply_swipe(swipe(1, 2, Action::Like)),
            log.apply_swipe(swipe(2, 1, Action::Like)),
        );
        let outcomes = [a.unwrap().outcome(), b.unwrap().outcome()];

        assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Match).count(), 1);
        assert_eq!(matched_rows(&pool).await, 2);
    }

    #[sqlx::test]
    async fn superlike_answer_is_matched_for_both_users(pool: PgPool) {
        seed_users(&pool, 3).await;
        let log = PgSwipeLog::new(pool.clone());
        log.apply_swipe(swipe(1, 2, Action::Like)).await.unwrap();
        let answer = log.apply_swipe(swipe(2, 1, Action::SuperLike)).await.unwrap();
        assert_eq!(answer.outcome(), Outcome::Match);

        log.apply_swipe(swipe(3, 1, Action::SuperLike)).await.unwrap();
        log.apply_swipe(swipe(1, 3, Action::Like)).await.unwrap();

        assert_eq!(matched_rows(&pool).await, 0);
        assert_eq!(log.matched_targets(1).await.unwrap(), vec![2]);
        assert_eq!(log.matched_targets(2).await.unwrap(), vec![1]);
        assert!(log.matched_targets(3).await.unwrap().is_empty());
    }
}
