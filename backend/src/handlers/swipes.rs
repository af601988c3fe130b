use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ActingUser, ApiRejection, AppState, internal_error, reject};
use crate::models::{Action, Outcome, SwipeRecord, UserId};

#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub is_super_like: bool,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub outcome: String,
    pub outcome_code: u8,
}

impl From<Outcome> for SwipeResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome: outcome.to_string(),
            outcome_code: outcome.code(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub swipes: Vec<SwipeRecord>,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub profile_ids: Vec<UserId>,
}

/// An empty body is a plain like.
fn parse_like_request(body: &[u8]) -> Result<LikeRequest, ApiRejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LikeRequest::default());
    }
    serde_json::from_slice(body).map_err(|_| reject(StatusCode::BAD_REQUEST, "invalid request"))
}

fn target_id(raw: &str) -> Result<UserId, ApiRejection> {
    raw.parse()
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "invalid profile id"))
}

async fn swipe(state: &AppState, user: UserId, raw_target: &str, action: Action) -> Result<Json<SwipeResponse>, ApiRejection> {
    let target = target_id(raw_target)?;

    let outcome = state
        .engine
        .record_swipe(user, target, action)
        .await
        .map_err(internal_error("failed to swipe"))?;

    Ok(Json(outcome.into()))
}

pub async fn like_profile(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<SwipeResponse>, ApiRejection> {
    let request = parse_like_request(&body)?;
    let action = if request.is_super_like { Action::SuperLike } else { Action::Like };

    swipe(&state, user, &id, action).await
}

pub async fn pass_profile(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(id): Path<String>,
) -> Result<Json<SwipeResponse>, ApiRejection> {
    swipe(&state, user, &id, Action::Pass).await
}

pub async fn swipe_history(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiRejection> {
    let swipes = state
        .log
        .swipes_for(user, query.date)
        .await
        .map_err(internal_error("failed to load swipes"))?;

    Ok(Json(HistoryResponse { swipes }))
}

pub async fn matched_profiles(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
) -> Result<Json<MatchesResponse>, ApiRejection> {
    let matched = state
        .index
        .get_matched(user)
        .await
        .map_err(internal_error("failed to load matches"))?;

    Ok(Json(MatchesResponse {
        profile_ids: matched.into_iter().collect(),
    }))
}
