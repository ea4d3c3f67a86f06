use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{DeckId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck title cannot be empty")]
    EmptyTitle,

    #[error("deck difficulty must be between 1 and 5, got {provided}")]
    InvalidDifficulty { provided: u8 },
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// A user's collection of flashcards on one topic.
///
/// The progress engine only reads decks — to verify ownership before
/// recording attempts and to label dashboard rollups — but the model carries
/// the full set of fields the application stores for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    id: DeckId,
    user_id: UserId,
    title: String,
    description: Option<String>,
    subject: Option<String>,
    category: Option<String>,
    difficulty: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Deck {
    /// Creates a new deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckError::EmptyTitle` if the title is empty or
    /// whitespace-only, `DeckError::InvalidDifficulty` if difficulty is
    /// outside 1..=5.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DeckId,
        user_id: UserId,
        title: impl Into<String>,
        description: Option<String>,
        subject: Option<String>,
        category: Option<String>,
        difficulty: u8,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DeckError::EmptyTitle);
        }
        if !(1..=5).contains(&difficulty) {
            return Err(DeckError::InvalidDifficulty {
                provided: difficulty,
            });
        }

        let trim_opt = |s: Option<String>| {
            s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
        };

        Ok(Self {
            id,
            user_id,
            title: title.trim().to_owned(),
            description: trim_opt(description),
            subject: trim_opt(subject),
            category: trim_opt(category),
            difficulty,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuild a deck from storage, keeping both timestamps as stored.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if the stored title or difficulty fail validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: DeckId,
        user_id: UserId,
        title: String,
        description: Option<String>,
        subject: Option<String>,
        category: Option<String>,
        difficulty: u8,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let mut deck = Self::new(
            id,
            user_id,
            title,
            description,
            subject,
            category,
            difficulty,
            created_at,
        )?;
        deck.updated_at = updated_at;
        Ok(deck)
    }

    /// Marks the deck as modified at the given time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> u8 {
        self.difficulty
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
