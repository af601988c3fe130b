//! Drops and recomputes the profile indexes of the given users from the
//! swipe log. Safe to run at any time: the indexes are derived data.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use matchmaker::{
    cache::{connect_redis, IndexKeys, IndexSizes, IndexSnapshot, ProfileIndexCache, RedisCache},
    db::{DatabaseConfig, PgSwipeLog},
    get_db_pool,
    models::UserId,
    utils::{init_logging, Config},
};
use mockable::DefaultClock;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "rebuild_indexes", about = "Rebuild cached like/match indexes from the swipe log")]
struct Args {
    /// User whose indexes are rebuilt (repeatable)
    #[arg(long = "user", required = true, num_args = 1..)]
    users: Vec<UserId>,

    /// Only drop the cached indexes; the next read repopulates them
    #[arg(long)]
    invalidate_only: bool,
}

/// Whether the cache now holds sets of the rebuilt sizes.
fn cache_holds(snapshot: &IndexSnapshot, sizes: IndexSizes) -> bool {
    sizes.liked_today == snapshot.liked_today.len() as u64
        && sizes.matched == snapshot.matched.len() as u64
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    let redis = connect_redis(&config.redis_url).await?;

    let index = ProfileIndexCache::new(
        Arc::new(RedisCache::new(redis)),
        Arc::new(PgSwipeLog::new(pool)),
        Arc::new(DefaultClock),
        config.timezone,
        IndexKeys::new(config.cache_key_prefix.clone()),
    );

    let mut failures = 0usize;
    for user_id in args.users {
        if args.invalidate_only {
            match index.invalidate(user_id).await {
                Ok(()) => info!(user_id, "invalidated indexes"),
                Err(e) => {
                    failures += 1;
                    error!(user_id, error = %e, "failed to invalidate indexes");
                }
            }
            continue;
        }

        match index.rebuild(user_id).await {
            Ok(snapshot) => {
                info!(
                    user_id,
                    likes_today = snapshot.likes_today,
                    liked_today = snapshot.liked_today.len(),
                    matched = snapshot.matched.len(),
                    "rebuilt indexes"
                );
                match index.cached_set_sizes(user_id).await {
                    Ok(sizes) if cache_holds(&snapshot, sizes) => {}
                    Ok(sizes) => warn!(
                        user_id,
                        cached_liked_today = sizes.liked_today,
                        cached_matched = sizes.matched,
                        "cached sets differ from the rebuilt indexes"
                    ),
                    Err(e) => warn!(user_id, error = %e, "could not read back cached sets"),
                }
            }
            Err(e) => {
                failures += 1;
                error!(user_id, error = %e, "failed to rebuild indexes");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} user(s) could not be processed", failures);
    }
    Ok(())
}
