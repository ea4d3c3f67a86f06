use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{DeckId, FlashcardId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("front text cannot be empty")]
    EmptyFront,

    #[error("back text cannot be empty")]
    EmptyBack,
}

//
// ─── FLASHCARD ─────────────────────────────────────────────────────────────────
//

/// A single prompt/answer pair inside a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Flashcard {
    id: FlashcardId,
    deck_id: DeckId,
    front_text: String,
    back_text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Flashcard {
    /// Creates a new flashcard.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if either side is empty or whitespace-only.
    pub fn new(
        id: FlashcardId,
        deck_id: DeckId,
        front_text: impl Into<String>,
        back_text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, FlashcardError> {
        let front_text = front_text.into();
        let back_text = back_text.into();
        if front_text.trim().is_empty() {
            return Err(FlashcardError::EmptyFront);
        }
        if back_text.trim().is_empty() {
            return Err(FlashcardError::EmptyBack);
        }

        Ok(Self {
            id,
            deck_id,
            front_text: front_text.trim().to_owned(),
            back_text: back_text.trim().to_owned(),
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuild a flashcard from storage, keeping both timestamps as stored.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if either stored side fails validation.
    pub fn from_persisted(
        id: FlashcardId,
        deck_id: DeckId,
        front_text: String,
        back_text: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, FlashcardError> {
        let mut card = Self::new(id, deck_id, front_text, back_text, created_at)?;
        card.updated_at = updated_at;
        Ok(card)
    }

    /// Marks the card as modified at the given time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> FlashcardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn front_text(&self) -> &str {
        &self.front_text
    }

    #[must_use]
    pub fn back_text(&self) -> &str {
        &self.back_text
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn flashcard_rejects_empty_front() {
        let err = Flashcard::new(
            FlashcardId::new(1),
            DeckId::new(1),
            "  ",
            "answer",
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyFront);
    }

    #[test]
    fn flashcard_rejects_empty_back() {
        let err = Flashcard::new(
            FlashcardId::new(1),
            DeckId::new(1),
            "question",
            " ",
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, FlashcardError::EmptyBack);
    }

    #[test]
    fn flashcard_trims_both_sides() {
        let card = Flashcard::new(
            FlashcardId::new(9),
            DeckId::new(2),
            "  What is 2+2?  ",
            "  4  ",
            fixed_now(),
        )
        .unwrap();

        assert_eq!(card.front_text(), "What is 2+2?");
        assert_eq!(card.back_text(), "4");
        assert_eq!(card.updated_at(), card.created_at());
    }
}
