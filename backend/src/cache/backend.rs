use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use super::ttl::ttl_secs;
use crate::error::CacheError;
use crate::models::UserId;

/// The subset of Redis semantics the profile indexes rely on. Every write
/// that touches a key's expiry does so in the same atomic step as the
/// mutation, so no key is ever left without its TTL.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError>;

    /// Increments `key` only if it is present, keeping its TTL. Returns
    /// `None` and leaves the key absent otherwise.
    async fn incr_existing(&self, key: &str, delta: i64) -> Result<Option<i64>, CacheError>;

    /// Adds `members` and arms `ttl` in one transaction.
    async fn sadd_with_ttl(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Adds `members` only if the set is present, re-arming `ttl` when
    /// given. Returns whether the set was present.
    async fn sadd_existing(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError>;

    async fn smembers(&self, key: &str) -> Result<Vec<UserId>, CacheError>;

    async fn scard(&self, key: &str) -> Result<u64, CacheError>;

    async fn del(&self, keys: &[String]) -> Result<(), CacheError>;
}

const INCR_EXISTING: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return false
end
return redis.call('INCRBY', KEYS[1], ARGV[1])
";

// ARGV[1] is the TTL in seconds, 0 to keep the current one.
const SADD_EXISTING: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('SADD', KEYS[1], unpack(ARGV, 2))
if tonumber(ARGV[1]) > 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return 1
";

pub async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, CacheError> {
    let config = ConnectionManagerConfig::new().set_number_of_retries(1);

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

/// Redis adapter. The connection manager multiplexes and reconnects, so
/// cloning it per call is cheap.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    incr_existing: Script,
    sadd_existing: Script,
}

impl RedisCache {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            incr_existing: Script::new(INCR_EXISTING),
            sadd_existing: Script::new(SADD_EXISTING),
        }
    }
}

fn redis_ttl(ttl: Duration) -> i64 {
    i64::try_from(ttl_secs(ttl)).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn incr_existing(&self, key: &str, delta: i64) -> Result<Option<i64>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = self
            .incr_existing
            .key(key)
            .arg(delta)
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn sadd_with_ttl(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .sadd(key, members)
            .ignore()
            .expire(key, redis_ttl(ttl))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn sadd_existing(
        &self,
        key: &str,
        members: &[UserId],
        ttl: Option<Duration>,
    ) -> Result<bool, CacheError> {
        if members.is_empty() {
            return self.exists(key).await;
        }
        let mut conn = self.connection.clone();
        let present: bool = self
            .sadd_existing
            .key(key)
            .arg(ttl.map_or(0, redis_ttl))
            .arg(members)
            .invoke_async(&mut conn)
            .await?;
        Ok(present)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<UserId>, CacheError> {
        let mut conn = self.connection.clone();
        let members: Vec<UserId> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn scard(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection.clone();
        let size: u64 = conn.scard(key).await?;
        Ok(size)
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(keys).await?;
        Ok(())
    }
}
