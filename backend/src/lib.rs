pub mod cache;
pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use utils::config::Config;
pub use db::connection::get_db_pool;
pub use error::{CacheError, StoreError};

// Re-export common types
pub use sqlx::PgPool;
pub use anyhow::Result;
