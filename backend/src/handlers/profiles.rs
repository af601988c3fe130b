use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::{ActingUser, ApiRejection, AppState, internal_error, reject};
use crate::constants::{DEFAULT_CANDIDATE_LIMIT, MAX_CANDIDATE_LIMIT};
use crate::models::{Profile, UserId};

#[derive(Debug, Deserialize)]
pub struct ProfilesQuery {
    /// Comma separated profile ids the client already holds
    pub exclude: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ProfilesResponse {
    pub profiles: Vec<Profile>,
}

fn parse_exclude(raw: Option<&str>) -> Result<Vec<UserId>, ApiRejection> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|_| reject(StatusCode::BAD_REQUEST, format!("invalid profile id in exclude: {}", id)))
        })
        .collect()
}

pub async fn get_profiles(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Query(query): Query<ProfilesQuery>,
) -> Result<Json<ProfilesResponse>, ApiRejection> {
    let exclude = parse_exclude(query.exclude.as_deref())?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CANDIDATE_LIMIT)
        .min(MAX_CANDIDATE_LIMIT);

    let profiles = state
        .selector
        .get_candidates(user, &exclude, limit)
        .await
        .map_err(internal_error("failed to get profiles"))?;

    Ok(Json(ProfilesResponse { profiles }))
}
