use flashlearn_core::model::{Deck, DeckId, UserId};
use flashlearn_core::time::Clock;
use storage::repository::{NewDeckRecord, Storage};

use crate::error::DeckServiceError;

/// Orchestrates deck creation and persistence, scoped to the owning user.
#[derive(Clone)]
pub struct DeckService {
    clock: Clock,
    storage: Storage,
}

impl DeckService {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            clock: Clock::default(),
            storage,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Create a new deck for the user and persist it.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` for validation failures.
    /// Returns `DeckServiceError::Storage` if persistence fails.
    pub async fn create_deck(
        &self,
        user_id: UserId,
        title: String,
        description: Option<String>,
        subject: Option<String>,
        category: Option<String>,
        difficulty: u8,
    ) -> Result<DeckId, DeckServiceError> {
        let now = self.clock.now();
        let deck = Deck::new(
            DeckId::new(1),
            user_id,
            title,
            description,
            subject,
            category,
            difficulty,
            now,
        )?;
        let deck_id = self
            .storage
            .decks
            .insert_new_deck(NewDeckRecord::from_deck(&deck))
            .await?;
        Ok(deck_id)
    }

    /// List the user's decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_decks(&self, user_id: UserId) -> Result<Vec<Deck>, DeckServiceError> {
        let decks = self.storage.decks.list_decks(user_id).await?;
        Ok(decks)
    }

    /// Fetch one of the user's decks by ID.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` if the deck does not exist or
    /// belongs to another user.
    pub async fn get_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Deck, DeckServiceError> {
        self.owned_deck(user_id, deck_id).await
    }

    /// Replace the editable fields of a deck and stamp `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` if the deck is missing or owned
    /// by another user, `Deck` for validation failures, `Storage` on
    /// repository failures.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        title: String,
        description: Option<String>,
        subject: Option<String>,
        category: Option<String>,
        difficulty: u8,
    ) -> Result<Deck, DeckServiceError> {
        let deck = self.owned_deck(user_id, deck_id).await?;

        let mut updated = Deck::new(
            deck.id(),
            deck.user_id(),
            title,
            description,
            subject,
            category,
            difficulty,
            deck.created_at(),
        )?;
        updated.touch(self.clock.now());
        self.storage.decks.upsert_deck(&updated).await?;
        Ok(updated)
    }

    /// Delete one of the user's decks, cascading to its flashcards and
    /// progress rows.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` if the deck is missing or owned
    /// by another user, `Storage` on repository failures.
    pub async fn delete_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<(), DeckServiceError> {
        self.owned_deck(user_id, deck_id).await?;
        self.storage.decks.delete_deck(deck_id).await?;
        Ok(())
    }

    async fn owned_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Deck, DeckServiceError> {
        self.storage
            .decks
            .get_deck(deck_id)
            .await?
            .filter(|d| d.user_id() == user_id)
            .ok_or(DeckServiceError::NotFound)
    }
}
