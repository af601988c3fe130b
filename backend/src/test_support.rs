use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use mockable::Clock;

use crate::cache::{IndexKeys, MemoryCache, ProfileIndexCache};
use crate::db::{MemorySwipeLog, MemoryUserDirectory};
use crate::models::UserId;
use crate::services::{CandidateSelector, MatchEngine};

/// Settable clock for tests.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().expect("clock lock poisoned") = now;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock poisoned")
    }
}

pub struct Harness {
    pub engine: Arc<MatchEngine>,
    pub selector: Arc<CandidateSelector>,
    pub index: Arc<ProfileIndexCache>,
    pub log: Arc<MemorySwipeLog>,
    pub users: Arc<MemoryUserDirectory>,
    pub cache: Arc<MemoryCache>,
    pub clock: Arc<MutableClock>,
}

/// Directory with non-premium users `1..=user_count`, clock at 09:00 UTC.
pub async fn harness(user_count: UserId) -> Harness {
    let clock = Arc::new(MutableClock::new(
        "2025-06-01T09:00:00Z".parse().expect("valid timestamp"),
    ));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let log = Arc::new(MemorySwipeLog::new());
    let users = Arc::new(MemoryUserDirectory::new());
    for id in 1..=user_count {
        users.insert(id, &format!("User{id}"), false).await;
    }

    let index = Arc::new(ProfileIndexCache::new(
        cache.clone(),
        log.clone(),
        clock.clone(),
        Tz::UTC,
        IndexKeys::new("test"),
    ));
    let engine = Arc::new(MatchEngine::new(
        users.clone(),
        log.clone(),
        index.clone(),
        clock.clone(),
        Tz::UTC,
    ));
    let selector = Arc::new(CandidateSelector::new(users.clone(), index.clone()));

    Harness {
        engine,
        selector,
        index,
        log,
        users,
        cache,
        clock,
    }
}
