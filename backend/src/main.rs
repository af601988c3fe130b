use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use matchmaker::{
    cache::{connect_redis, IndexKeys, ProfileIndexCache, RedisCache},
    db::{DatabaseConfig, PgSwipeLog, PgUserDirectory},
    get_db_pool,
    handlers::{create_router, AppState},
    services::{CandidateSelector, MatchEngine},
    utils,
    Config,
};
use mockable::{Clock, DefaultClock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    matchmaker::db::migrations::run_migrations(&pool).await?;

    let redis = connect_redis(&config.redis_url).await?;
    tracing::info!("connected to redis");

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let log = Arc::new(PgSwipeLog::new(pool.clone()));
    let users = Arc::new(PgUserDirectory::new(pool));
    let index = Arc::new(ProfileIndexCache::new(
        Arc::new(RedisCache::new(redis)),
        log.clone(),
        clock.clone(),
        config.timezone,
        IndexKeys::new(config.cache_key_prefix.clone()),
    ));
    let engine = MatchEngine::new(users.clone(), log.clone(), index.clone(), clock, config.timezone)
        .with_daily_like_quota(config.daily_like_quota);
    let selector = CandidateSelector::new(users, index.clone());

    let state = AppState {
        engine: Arc::new(engine),
        selector: Arc::new(selector),
        index,
        log,
    };

    let port = config.port;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!(
        "Server running on port {} (timezone {}, daily like quota {})",
        port,
        config.timezone,
        config.daily_like_quota
    );

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_app(state: AppState) -> Router {
    create_router(state)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn create_cors_layer() -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Comma separated list of allowed origins, permissive when unset
    let origins: Vec<HeaderValue> = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
