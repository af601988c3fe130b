use thiserror::Error;

/// Failures of the durable swipe log or the user directory.
///
/// These abort the current operation and are surfaced to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt swipe row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Failures of the cache backend. Never escapes the profile index cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("key {key} holds a value of the wrong type")]
    WrongType { key: String },
}
