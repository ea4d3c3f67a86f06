use flashlearn_core::model::{DeckId, Flashcard, FlashcardId};

use super::SqliteRepository;
use super::mapping::{flashcard_id_from_i64, id_i64, map_flashcard_row};
use crate::repository::{FlashcardRepository, NewFlashcardRecord, StorageError};

#[async_trait::async_trait]
impl FlashcardRepository for SqliteRepository {
    async fn insert_new_flashcard(
        &self,
        card: NewFlashcardRecord,
    ) -> Result<FlashcardId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO flashcards (deck_id, front_text, back_text, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ",
        )
        .bind(id_i64("deck_id", card.deck_id.value())?)
        .bind(card.front_text)
        .bind(card.back_text)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        flashcard_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO flashcards (id, deck_id, front_text, back_text, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                -- keep deck_id and created_at from the original insert
                front_text = excluded.front_text,
                back_text = excluded.back_text,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("flashcard_id", card.id().value())?)
        .bind(id_i64("deck_id", card.deck_id().value())?)
        .bind(card.front_text().to_owned())
        .bind(card.back_text().to_owned())
        .bind(card.created_at())
        .bind(card.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, deck_id, front_text, back_text, created_at, updated_at
            FROM flashcards WHERE id = ?1
            ",
        )
        .bind(id_i64("flashcard_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_flashcard_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_flashcards(&self, deck_id: DeckId) -> Result<Vec<Flashcard>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, deck_id, front_text, back_text, created_at, updated_at
            FROM flashcards
            WHERE deck_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("deck_id", deck_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_flashcard_row(&row)?);
        }
        Ok(cards)
    }

    async fn delete_flashcard(&self, id: FlashcardId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(id_i64("flashcard_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
