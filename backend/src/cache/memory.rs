use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::backend::CacheBackend;
use crate::error::CacheError;
use crate::models::UserId;
use mockable::Clock;

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Set(BTreeSet<UserId>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process stand-in for Redis. Expiry is evaluated against the injected
/// clock and an outage can be simulated with [`MemoryCache::set_unavailable`].
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Drops every key, as after a cache flush.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Remaining lifetime of `key`, `None` when absent or persistent.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.utc();
        let entries = self.entries.lock().await;
        let expires_at = entries.get(key)?.expires_at?;
        (expires_at - now).to_std().ok()
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory cache switched off".to_string()));
        }
        Ok(())
    }

    fn expiry(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(ttl).ok().map(|ttl| self.clock.utc() + ttl)
    }

    /// Removes `key` if it has expired, then returns the live entry.
    fn live<'a>(&self, entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = self.clock.utc();
        if entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= now)
        {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        Ok(self.live(&mut entries, key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        match self.live(&mut entries, key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v)),
            Some(Value::Set(_)) => Err(CacheError::WrongType { key: key.to_string() }),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        self.check_available()?;
        let expires_at = self.expiry(ttl);
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: Value::Int(value),
                expires_at,
            },
        );
        Ok(())
    }

    async fn incr_existing(&self, key: &str, delta: i64) -> Result<Option<i64>, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        match self.live(&mut entries, key) {
            Some(Entry { value: Value::Int(v), .. }) => {
                *v += delta;
                Ok(Some(*v))
            }
            Some(_) => Err(CacheError::WrongType { key: key.to_string() }),
            None => Ok(None),
        }
    }

    async fn sadd_with_ttl(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.check_available()?;
        if members.is_empty() {
            return Ok(());
        }
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().await;
        match self.live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(set),
                expires_at: expiry,
            }) => {
                set.extend(members.iter().copied());
                *expiry = expires_at;
                Ok(())
            }
            Some(_) => Err(CacheError::WrongType { key: key.to_string() }),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(members.iter().copied().collect()),
                        expires_at,
                    },
                );
                Ok(())
            }
        }
    }

    async fn sadd_existing(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        self.check_available()?;
        let expires_at = ttl.map(|ttl| self.expiry(ttl));
        let mut entries = self.entries.lock().await;
        match self.live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(set),
                expires_at: expiry,
            }) => {
                set.extend(members.iter().copied());
                if let Some(expires_at) = expires_at {
                    *expiry = expires_at;
                }
                Ok(true)
            }
            Some(_) => Err(CacheError::WrongType { key: key.to_string() }),
            None => Ok(false),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<UserId>, CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        match self.live(&mut entries, key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().copied().collect()),
            Some(Value::Int(_)) => Err(CacheError::WrongType { key: key.to_string() }),
        }
    }

    async fn scard(&self, key: &str) -> Result<u64, CacheError> {
        Ok(self.smembers(key).await?.len() as u64)
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}
