use flashlearn_core::model::{UserId, UserStats};

use super::SqliteRepository;
use super::mapping::{id_i64, map_stats_row};
use crate::repository::{StatsRepository, StorageError};

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn get_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, mastery_level, retention_rate, focus_score, study_streak,
                   weekly_goal, minutes_per_day, cards_mastered, accuracy
            FROM user_stats
            WHERE user_id = ?1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_stats_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert_stats(&self, stats: &UserStats) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        super::progress_repo::upsert_stats_in(&mut tx, stats).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
