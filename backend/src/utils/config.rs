use anyhow::Result;
use chrono_tz::Tz;
use std::env;
use crate::constants::{
    DAILY_LIKE_QUOTA, DEFAULT_CACHE_KEY_PREFIX, DEFAULT_SERVER_PORT, DEFAULT_SWIPE_TIMEZONE,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    /// Timezone whose midnight resets quotas and today's indexes
    pub timezone: Tz,
    pub daily_like_quota: i64,
    pub cache_key_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let timezone_name = env::var("SWIPE_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_SWIPE_TIMEZONE.to_string());
        let timezone = parse_timezone(&timezone_name)?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            redis_url: env::var("REDIS_URL")
                .map_err(|_| anyhow::anyhow!("REDIS_URL must be set"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            timezone,
            daily_like_quota: env::var("DAILY_LIKE_QUOTA")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DAILY_LIKE_QUOTA),
            cache_key_prefix: env::var("CACHE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_CACHE_KEY_PREFIX.to_string()),
        })
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("invalid SWIPE_TIMEZONE {:?}: {}", name, e))
}
