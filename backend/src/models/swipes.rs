use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// A single decision one user makes about another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Pass,
    SuperLike,
}

impl Action {
    /// Storage code used in the `swipes.action` column.
    pub const fn code(self) -> i16 {
        match self {
            Action::Like => 1,
            Action::Pass => 2,
            Action::SuperLike => 3,
        }
    }

    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Action::Like),
            2 => Some(Action::Pass),
            3 => Some(Action::SuperLike),
            _ => None,
        }
    }

    /// Like and SuperLike both count against the daily quota.
    pub const fn is_like(self) -> bool {
        matches!(self, Action::Like | Action::SuperLike)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Like => "like",
            Action::Pass => "pass",
            Action::SuperLike => "superlike",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of recording a swipe. Computed per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Both users liked each other
    Match,
    /// The user passed on someone who had liked them
    Missed,
    /// Daily quota exhausted
    LimitReached,
    /// No reciprocal like (yet)
    NoLike,
    /// Target profile does not exist
    NotFound,
}

impl Outcome {
    /// Classifies a stored swipe given whether the target had already liked
    /// the acting user.
    pub const fn classify(action: Action, reciprocal_like: bool) -> Self {
        match (reciprocal_like, action) {
            (true, Action::Like | Action::SuperLike) => Outcome::Match,
            (true, Action::Pass) => Outcome::Missed,
            (false, _) => Outcome::NoLike,
        }
    }

    /// Stable numeric code exposed to API clients.
    pub const fn code(self) -> u8 {
        match self {
            Outcome::Match => 1,
            Outcome::Missed => 2,
            Outcome::LimitReached => 3,
            Outcome::NoLike => 4,
            Outcome::NotFound => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Match => "Match",
            Outcome::Missed => "Missed",
            Outcome::LimitReached => "Limit Reached",
            Outcome::NoLike => "No Like",
            Outcome::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the durable swipe log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub id: i64,
    pub user_id: UserId,
    pub target_id: UserId,
    pub swipe_date: NaiveDate,
    pub action: Action,
    pub created_at: DateTime<Utc>,
    pub is_matched: bool,
}

/// A swipe about to be written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSwipe {
    pub user_id: UserId,
    pub target_id: UserId,
    pub swipe_date: NaiveDate,
    pub action: Action,
    pub created_at: DateTime<Utc>,
}

/// What the log did with a [`NewSwipe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeWrite {
    /// The stored row: the fresh insert, or the row already present for the
    /// same user, target and day.
    pub record: SwipeRecord,
    /// Prior Like from the target towards the acting user, if any.
    pub reciprocal: Option<SwipeRecord>,
    /// False when an earlier swipe for the same day was kept instead.
    pub inserted: bool,
}

impl SwipeWrite {
    pub fn outcome(&self) -> Outcome {
        Outcome::classify(self.record.action, self.reciprocal.is_some())
    }
}
