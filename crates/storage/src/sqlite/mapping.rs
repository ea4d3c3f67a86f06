use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use flashlearn_core::model::{
    Deck, DeckId, Flashcard, FlashcardId, ProgressRecord, ReviewStatus, UserId, UserStats,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn flashcard_id_from_i64(v: i64) -> Result<FlashcardId, StorageError> {
    Ok(FlashcardId::new(i64_to_u64("flashcard_id", v)?))
}

/// Converts a stored status string back into `ReviewStatus`.
/// This must stay consistent with `ReviewStatus::as_str`.
pub(crate) fn parse_review_status(s: &str) -> Result<ReviewStatus, StorageError> {
    match s {
        "new" => Ok(ReviewStatus::New),
        "learning" => Ok(ReviewStatus::Learning),
        "reviewing" => Ok(ReviewStatus::Reviewing),
        "mastered" => Ok(ReviewStatus::Mastered),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn map_deck_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    let difficulty_i64: i64 = row.try_get("difficulty").map_err(ser)?;
    let difficulty = u8::try_from(difficulty_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid difficulty: {difficulty_i64}")))?;

    Deck::from_persisted(
        deck_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("subject").map_err(ser)?,
        row.try_get::<Option<String>, _>("category").map_err(ser)?,
        difficulty,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_flashcard_row(row: &SqliteRow) -> Result<Flashcard, StorageError> {
    Flashcard::from_persisted(
        flashcard_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        row.try_get::<String, _>("front_text").map_err(ser)?,
        row.try_get::<String, _>("back_text").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let status_str: String = row.try_get("review_status").map_err(ser)?;

    ProgressRecord::from_persisted(
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get::<i64, _>("deck_id").map_err(ser)?)?,
        flashcard_id_from_i64(row.try_get::<i64, _>("flashcard_id").map_err(ser)?)?,
        i64_to_u32("study_count", row.try_get("study_count").map_err(ser)?)?,
        i64_to_u32(
            "correct_attempts",
            row.try_get("correct_attempts").map_err(ser)?,
        )?,
        i64_to_u32(
            "incorrect_attempts",
            row.try_get("incorrect_attempts").map_err(ser)?,
        )?,
        row.try_get("total_study_time").map_err(ser)?,
        row.try_get("last_studied_at").map_err(ser)?,
        row.try_get("next_review_at").map_err(ser)?,
        parse_review_status(status_str.as_str())?,
        row.try_get::<i64, _>("is_learned").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_stats_row(row: &SqliteRow) -> Result<UserStats, StorageError> {
    Ok(UserStats::from_persisted(
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get("mastery_level").map_err(ser)?,
        row.try_get("retention_rate").map_err(ser)?,
        row.try_get("focus_score").map_err(ser)?,
        i64_to_u32("study_streak", row.try_get("study_streak").map_err(ser)?)?,
        i64_to_u32("weekly_goal", row.try_get("weekly_goal").map_err(ser)?)?,
        row.try_get("minutes_per_day").map_err(ser)?,
        i64_to_u32(
            "cards_mastered",
            row.try_get("cards_mastered").map_err(ser)?,
        )?,
        row.try_get("accuracy").map_err(ser)?,
    ))
}
