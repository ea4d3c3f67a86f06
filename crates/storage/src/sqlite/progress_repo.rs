use flashlearn_core::model::{
    DeckId, DerivedStats, FlashcardId, ProgressRecord, UserId, UserStats,
};
use sqlx::Sqlite;

use super::SqliteRepository;
use super::mapping::{id_i64, map_progress_row, map_stats_row};
use crate::repository::{AttemptPersistence, ProgressRepository, StorageError};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, deck_id, flashcard_id, study_count, correct_attempts,
                   incorrect_attempts, total_study_time, last_studied_at,
                   next_review_at, review_status, is_learned
            FROM progress
            WHERE user_id = ?1 AND flashcard_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("flashcard_id", flashcard_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_progress_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, deck_id, flashcard_id, study_count, correct_attempts,
                   incorrect_attempts, total_study_time, last_studied_at,
                   next_review_at, review_status, is_learned
            FROM progress
            WHERE user_id = ?1
            ORDER BY flashcard_id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn list_for_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, deck_id, flashcard_id, study_count, correct_attempts,
                   incorrect_attempts, total_study_time, last_studied_at,
                   next_review_at, review_status, is_learned
            FROM progress
            WHERE user_id = ?1 AND deck_id = ?2
            ORDER BY flashcard_id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("deck_id", deck_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn delete_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM progress WHERE user_id = ?1 AND flashcard_id = ?2")
            .bind(id_i64("user_id", user_id.value())?)
            .bind(id_i64("flashcard_id", flashcard_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AttemptPersistence for SqliteRepository {
    async fn apply_attempt(
        &self,
        record: &ProgressRecord,
        expected_study_count: Option<u32>,
    ) -> Result<UserStats, StorageError> {
        let user_id = id_i64("user_id", record.user_id().value())?;
        let deck_id = id_i64("deck_id", record.deck_id().value())?;
        let flashcard_id = id_i64("flashcard_id", record.flashcard_id().value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match expected_study_count {
            None => {
                // First attempt for this pair; the (user_id, flashcard_id)
                // primary key turns a racing insert into a Conflict.
                sqlx::query(
                    r"
                    INSERT INTO progress (
                        user_id, deck_id, flashcard_id, study_count, correct_attempts,
                        incorrect_attempts, total_study_time, last_studied_at,
                        next_review_at, review_status, is_learned
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ",
                )
                .bind(user_id)
                .bind(deck_id)
                .bind(flashcard_id)
                .bind(i64::from(record.study_count()))
                .bind(i64::from(record.correct_attempts()))
                .bind(i64::from(record.incorrect_attempts()))
                .bind(record.total_study_time())
                .bind(record.last_studied_at())
                .bind(record.next_review_at())
                .bind(record.review_status().as_str())
                .bind(i64::from(record.is_learned()))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StorageError::Conflict
                    } else {
                        StorageError::Connection(e.to_string())
                    }
                })?;
            }
            Some(expected) => {
                // study_count doubles as the record's version: the predicate
                // fails when another writer committed since our load.
                let res = sqlx::query(
                    r"
                    UPDATE progress SET
                        study_count = ?4,
                        correct_attempts = ?5,
                        incorrect_attempts = ?6,
                        total_study_time = ?7,
                        last_studied_at = ?8,
                        next_review_at = ?9,
                        review_status = ?10,
                        is_learned = ?11
                    WHERE user_id = ?1 AND flashcard_id = ?2 AND study_count = ?3
                    ",
                )
                .bind(user_id)
                .bind(flashcard_id)
                .bind(i64::from(expected))
                .bind(i64::from(record.study_count()))
                .bind(i64::from(record.correct_attempts()))
                .bind(i64::from(record.incorrect_attempts()))
                .bind(record.total_study_time())
                .bind(record.last_studied_at())
                .bind(record.next_review_at())
                .bind(record.review_status().as_str())
                .bind(i64::from(record.is_learned()))
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;

                if res.rows_affected() == 0 {
                    return Err(StorageError::Conflict);
                }
            }
        }

        // Recompute the materialized stats from the full record set inside
        // the same transaction, so readers never see one write without the
        // other.
        let rows = sqlx::query(
            r"
            SELECT user_id, deck_id, flashcard_id, study_count, correct_attempts,
                   incorrect_attempts, total_study_time, last_studied_at,
                   next_review_at, review_status, is_learned
            FROM progress
            WHERE user_id = ?1
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        let derived = DerivedStats::from_records(&records);

        let stats_row = sqlx::query(
            r"
            SELECT user_id, mastery_level, retention_rate, focus_score, study_streak,
                   weekly_goal, minutes_per_day, cards_mastered, accuracy
            FROM user_stats
            WHERE user_id = ?1
            ",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut stats = match stats_row {
            Some(row) => map_stats_row(&row)?,
            None => UserStats::zeroed(record.user_id()),
        };
        stats.apply_derived(&derived);

        upsert_stats_in(&mut tx, &stats).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(stats)
    }
}

pub(crate) async fn upsert_stats_in(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    stats: &UserStats,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO user_stats (
            user_id, mastery_level, retention_rate, focus_score, study_streak,
            weekly_goal, minutes_per_day, cards_mastered, accuracy
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(user_id) DO UPDATE SET
            mastery_level = excluded.mastery_level,
            retention_rate = excluded.retention_rate,
            focus_score = excluded.focus_score,
            study_streak = excluded.study_streak,
            weekly_goal = excluded.weekly_goal,
            minutes_per_day = excluded.minutes_per_day,
            cards_mastered = excluded.cards_mastered,
            accuracy = excluded.accuracy
        ",
    )
    .bind(id_i64("user_id", stats.user_id().value())?)
    .bind(stats.mastery_level())
    .bind(stats.retention_rate())
    .bind(stats.focus_score())
    .bind(i64::from(stats.study_streak()))
    .bind(i64::from(stats.weekly_goal()))
    .bind(stats.minutes_per_day())
    .bind(i64::from(stats.cards_mastered()))
    .bind(stats.accuracy())
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    Ok(())
}
