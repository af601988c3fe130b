use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i32;

/// Read-only projection of a directory user shown as a swipe candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub username: Option<String>,
}
