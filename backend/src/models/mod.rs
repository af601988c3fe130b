pub mod swipes;
pub mod users;

pub use swipes::{Action, NewSwipe, Outcome, SwipeRecord, SwipeWrite};
pub use users::{Profile, UserId};
