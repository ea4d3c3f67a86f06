use flashlearn_core::model::{Deck, DeckId, UserId};

use super::SqliteRepository;
use super::mapping::{deck_id_from_i64, id_i64, map_deck_row};
use crate::repository::{DeckRepository, NewDeckRecord, StorageError};

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO decks (user_id, title, description, subject, category, difficulty, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ",
        )
        .bind(id_i64("user_id", deck.user_id.value())?)
        .bind(deck.title)
        .bind(deck.description)
        .bind(deck.subject)
        .bind(deck.category)
        .bind(i64::from(deck.difficulty))
        .bind(deck.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        deck_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO decks (id, user_id, title, description, subject, category, difficulty, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                -- keep user_id and created_at from the original insert
                title = excluded.title,
                description = excluded.description,
                subject = excluded.subject,
                category = excluded.category,
                difficulty = excluded.difficulty,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_i64("deck_id", deck.id().value())?)
        .bind(id_i64("user_id", deck.user_id().value())?)
        .bind(deck.title().to_owned())
        .bind(deck.description().map(str::to_owned))
        .bind(deck.subject().map(str::to_owned))
        .bind(deck.category().map(str::to_owned))
        .bind(i64::from(deck.difficulty()))
        .bind(deck.created_at())
        .bind(deck.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, description, subject, category, difficulty, created_at, updated_at
            FROM decks WHERE id = ?1
            ",
        )
        .bind(id_i64("deck_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_deck_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn list_decks(&self, user_id: UserId) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, description, subject, category, difficulty, created_at, updated_at
            FROM decks
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            decks.push(map_deck_row(&row)?);
        }
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1")
            .bind(id_i64("deck_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
