use flashlearn_core::model::{DeckId, Flashcard, FlashcardId, UserId};
use flashlearn_core::time::Clock;
use storage::repository::{NewFlashcardRecord, Storage};

use crate::error::FlashcardServiceError;

/// Orchestrates flashcard creation and persistence.
///
/// Every operation resolves ownership through the deck: a flashcard is only
/// visible to the user who owns the deck it lives in.
#[derive(Clone)]
pub struct FlashcardService {
    clock: Clock,
    storage: Storage,
}

impl FlashcardService {
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

    /// Create a new flashcard in one of the user's decks.
    ///
    /// # Errors
    ///
    /// Returns `DeckNotFound` if the deck is missing or owned by another
    /// user, `Flashcard` for validation failures, `Storage` on repository
    /// failures.
    pub async fn create_flashcard(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        front_text: String,
        back_text: String,
    ) -> Result<FlashcardId, FlashcardServiceError> {
        self.owned_deck(user_id, deck_id).await?;

        let now = self.clock.now();
        let card = Flashcard::new(FlashcardId::new(1), deck_id, front_text, back_text, now)?;
        let card_id = self
            .storage
            .flashcards
            .insert_new_flashcard(NewFlashcardRecord::from_flashcard(&card))
            .await?;
        Ok(card_id)
    }

    /// List the flashcards in one of the user's decks.
    ///
    /// # Errors
    ///
    /// Returns `DeckNotFound` if the deck is missing or owned by another
    /// user, `Storage` on repository failures.
    pub async fn list_flashcards(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<Flashcard>, FlashcardServiceError> {
        self.owned_deck(user_id, deck_id).await?;
        let cards = self.storage.flashcards.list_flashcards(deck_id).await?;
        Ok(cards)
    }

    /// List every flashcard across all the user's decks, deck by deck.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardServiceError::Storage` if repository access fails.
    pub async fn list_all_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Flashcard>, FlashcardServiceError> {
        let decks = self.storage.decks.list_decks(user_id).await?;
        let mut cards = Vec::new();
        for deck in decks {
            cards.extend(self.storage.flashcards.list_flashcards(deck.id()).await?);
        }
        Ok(cards)
    }

    /// Update the text on one of the user's flashcards.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the flashcard is missing or not reachable
    /// through a deck the user owns, `Flashcard` for validation failures,
    /// `Storage` on repository failures.
    pub async fn update_flashcard(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
        front_text: String,
        back_text: String,
    ) -> Result<Flashcard, FlashcardServiceError> {
        let card = self.owned_flashcard(user_id, flashcard_id).await?;

        let mut updated = Flashcard::new(
            card.id(),
            card.deck_id(),
            front_text,
            back_text,
            card.created_at(),
        )?;
        updated.touch(self.clock.now());
        self.storage.flashcards.upsert_flashcard(&updated).await?;
        Ok(updated)
    }

    /// Delete one of the user's flashcards, cascading to its progress rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the flashcard is missing or not reachable
    /// through a deck the user owns, `Storage` on repository failures.
    pub async fn delete_flashcard(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<(), FlashcardServiceError> {
        self.owned_flashcard(user_id, flashcard_id).await?;
        self.storage.flashcards.delete_flashcard(flashcard_id).await?;
        Ok(())
    }

    async fn owned_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<(), FlashcardServiceError> {
        self.storage
            .decks
            .get_deck(deck_id)
            .await?
            .filter(|d| d.user_id() == user_id)
            .map(|_| ())
            .ok_or(FlashcardServiceError::DeckNotFound)
    }

    async fn owned_flashcard(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Flashcard, FlashcardServiceError> {
        let card = self
            .storage
            .flashcards
            .get_flashcard(flashcard_id)
            .await?
            .ok_or(FlashcardServiceError::NotFound)?;

        let owned = self
            .storage
            .decks
            .get_deck(card.deck_id())
            .await?
            .is_some_and(|d| d.user_id() == user_id);
        if !owned {
            return Err(FlashcardServiceError::NotFound);
        }
        Ok(card)
    }
}
