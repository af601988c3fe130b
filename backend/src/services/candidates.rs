use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ProfileIndexCache;
use crate::constants::CANDIDATE_OVERSAMPLE;
use crate::db::UserDirectory;
use crate::error::StoreError;
use crate::models::{Profile, UserId};

/// Picks random unseen profiles for the next swipe batch.
pub struct CandidateSelector {
    users: Arc<dyn UserDirectory>,
    index: Arc<ProfileIndexCache>,
    oversample: usize,
}

impl CandidateSelector {
    pub fn new(users: Arc<dyn UserDirectory>, index: Arc<ProfileIndexCache>) -> Self {
        Self {
            users,
            index,
            oversample: CANDIDATE_OVERSAMPLE,
        }
    }

    /// Up to `limit` random profiles excluding `exclude`, the user, and
    /// everyone they liked today or matched with. A short batch is valid.
    pub async fn get_candidates(
        &self,
        user_id: UserId,
        exclude: &[UserId],
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut excluded: BTreeSet<UserId> = exclude.iter().copied().collect();
        excluded.extend(self.index.get_liked_today(user_id).await?);
        excluded.extend(self.index.get_matched(user_id).await?);
        excluded.insert(user_id);

        let excluded: Vec<UserId> = excluded.into_iter().collect();
        let fetched = self
            .users
            .fetch_random(&excluded, limit.saturating_add(self.oversample))
            .await?;

        let candidates: Vec<Profile> = fetched
            .into_iter()
            .filter(|profile| excluded.binary_search(&profile.id).is_err())
            .take(limit)
            .collect();

        debug!(user_id, excluded = excluded.len(), returned = candidates.len(), "selected candidates");
        Ok(candidates)
    }
}
