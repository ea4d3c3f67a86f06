use flashlearn_core::model::{DerivedStats, StatsPatch, UserId, UserStats};
use storage::repository::{Storage, StorageError};

use crate::error::StatsServiceError;

/// Recompute a user's derived metrics from their full record set and persist
/// the merged row, creating it if absent. Settable fields are untouched.
pub(crate) async fn recompute_user_stats(
    storage: &Storage,
    user_id: UserId,
) -> Result<UserStats, StorageError> {
    let records = storage.progress.list_for_user(user_id).await?;
    let derived = DerivedStats::from_records(&records);

    let mut stats = storage
        .stats
        .get_stats(user_id)
        .await?
        .unwrap_or_else(|| UserStats::zeroed(user_id));
    stats.apply_derived(&derived);
    storage.stats.upsert_stats(&stats).await?;

    tracing::debug!(
        %user_id,
        mastery = stats.mastery_level(),
        cards_mastered = stats.cards_mastered(),
        "recomputed user stats"
    );
    Ok(stats)
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Serves and updates per-user rollup metrics.
///
/// The derived fields are recomputed transactionally with every attempt
/// write; this service covers the remaining paths — direct reads, explicit
/// recomputes, and the goal-setting partial updates.
#[derive(Clone)]
pub struct StatsService {
    storage: Storage,
}

impl StatsService {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Fetch a user's stats, falling back to the zero-valued row for users
    /// who have never studied or set a goal.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn get(&self, user_id: UserId) -> Result<UserStats, StatsServiceError> {
        let stats = self
            .storage
            .stats
            .get_stats(user_id)
            .await?
            .unwrap_or_else(|| UserStats::zeroed(user_id));
        Ok(stats)
    }

    /// Recompute the derived metrics from the user's current record set.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn recompute(&self, user_id: UserId) -> Result<UserStats, StatsServiceError> {
        let stats = recompute_user_stats(&self.storage, user_id).await?;
        Ok(stats)
    }

    /// Apply a partial update: each present field overwrites the stored
    /// value, absent fields stay put. Creates the row if absent.
    ///
    /// No bounds are imposed beyond type correctness — goal policy belongs
    /// to callers.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn update(
        &self,
        user_id: UserId,
        patch: &StatsPatch,
    ) -> Result<UserStats, StatsServiceError> {
        let mut stats = self
            .storage
            .stats
            .get_stats(user_id)
            .await?
            .unwrap_or_else(|| UserStats::zeroed(user_id));
        stats.apply_patch(patch);
        self.storage.stats.upsert_stats(&stats).await?;
        Ok(stats)
    }
}
