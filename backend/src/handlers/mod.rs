pub mod profiles;
pub mod swipes;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use serde::Serialize;

use crate::cache::ProfileIndexCache;
use crate::constants::USER_ID_HEADER;
use crate::db::SwipeLog;
use crate::error::StoreError;
use crate::models::UserId;
use crate::services::{CandidateSelector, MatchEngine};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub selector: Arc<CandidateSelector>,
    pub index: Arc<ProfileIndexCache>,
    pub log: Arc<dyn SwipeLog>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/match/profile", get(profiles::get_profiles))
        .route("/v1/match/profile/{id}/like", post(swipes::like_profile))
        .route("/v1/match/profile/{id}/pass", post(swipes::pass_profile))
        .route("/v1/match/swipes", get(swipes::swipe_history))
        .route("/v1/match/matches", get(swipes::matched_profiles))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiRejection = (StatusCode, Json<ApiError>);

pub fn reject(status: StatusCode, message: impl Into<String>) -> ApiRejection {
    (status, Json(ApiError { error: message.into() }))
}

/// Store failures become a generic 500; details stay in the logs.
pub fn internal_error(context: &'static str) -> impl FnOnce(StoreError) -> ApiRejection {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        reject(StatusCode::INTERNAL_SERVER_ERROR, context)
    }
}

/// Caller id forwarded by the authenticating gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = ApiRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing user identity"))?;

        header
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(ActingUser)
            .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "invalid user identity"))
    }
}
