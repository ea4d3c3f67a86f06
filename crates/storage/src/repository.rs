use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use flashlearn_core::model::{
    Deck, DeckId, DerivedStats, Flashcard, FlashcardId, ProgressRecord, UserId, UserStats,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── NEW-ROW RECORDS ───────────────────────────────────────────────────────────
//

/// Insert shape for a deck whose identifier the store will assign.
#[derive(Debug, Clone)]
pub struct NewDeckRecord {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub difficulty: u8,
    pub created_at: DateTime<Utc>,
}

impl NewDeckRecord {
    #[must_use]
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            user_id: deck.user_id(),
            title: deck.title().to_owned(),
            description: deck.description().map(str::to_owned),
            subject: deck.subject().map(str::to_owned),
            category: deck.category().map(str::to_owned),
            difficulty: deck.difficulty(),
            created_at: deck.created_at(),
        }
    }
}

/// Insert shape for a flashcard whose identifier the store will assign.
#[derive(Debug, Clone)]
pub struct NewFlashcardRecord {
    pub deck_id: DeckId,
    pub front_text: String,
    pub back_text: String,
    pub created_at: DateTime<Utc>,
}

impl NewFlashcardRecord {
    #[must_use]
    pub fn from_flashcard(card: &Flashcard) -> Self {
        Self {
            deck_id: card.deck_id(),
            front_text: card.front_text().to_owned(),
            back_text: card.back_text().to_owned(),
            created_at: card.created_at(),
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Insert a deck and return the identifier the store assigned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// Persist or update a deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// List a user's decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_decks(&self, user_id: UserId) -> Result<Vec<Deck>, StorageError>;

    /// Delete a deck, cascading to its flashcards and progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait FlashcardRepository: Send + Sync {
    /// Insert a flashcard and return the identifier the store assigned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flashcard cannot be stored.
    async fn insert_new_flashcard(
        &self,
        card: NewFlashcardRecord,
    ) -> Result<FlashcardId, StorageError>;

    /// Persist or update a flashcard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flashcard cannot be stored.
    async fn upsert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError>;

    /// Fetch a flashcard by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError>;

    /// List a deck's flashcards ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_flashcards(&self, deck_id: DeckId) -> Result<Vec<Flashcard>, StorageError>;

    /// Delete a flashcard, cascading to its progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the flashcard does not exist.
    async fn delete_flashcard(&self, id: FlashcardId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress row for one (user, flashcard) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// List every progress row a user owns, ordered by flashcard ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, StorageError>;

    /// List a user's progress rows for one deck, ordered by flashcard ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_for_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Delete the progress row for one (user, flashcard) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such row exists.
    async fn delete_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Fetch a user's stats row. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StorageError>;

    /// Persist or update a user's stats row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_stats(&self, stats: &UserStats) -> Result<(), StorageError>;
}

/// Transactional write path for attempt reporting.
///
/// Persists the updated progress record and the freshly recomputed user
/// stats in one transaction, so no reader can observe one without the other.
/// Writers are serialized with optimistic concurrency keyed on
/// `study_count`, which every successful attempt increments:
///
/// - `expected_study_count = None` inserts a first-attempt row; a racing
///   insert for the same (user, flashcard) pair surfaces as `Conflict`.
/// - `expected_study_count = Some(n)` updates only if the stored row still
///   holds `n`; an interleaved writer surfaces as `Conflict`.
///
/// Callers reload and retry on `Conflict`, so no attempt is ever lost.
#[async_trait]
pub trait AttemptPersistence: Send + Sync {
    /// Apply one attempt write and return the recomputed stats.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when another writer got there first,
    /// or other `StorageError` values on storage failures.
    async fn apply_attempt(
        &self,
        record: &ProgressRecord,
        expected_study_count: Option<u32>,
    ) -> Result<UserStats, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    decks: HashMap<DeckId, Deck>,
    flashcards: HashMap<FlashcardId, Flashcard>,
    progress: HashMap<(UserId, FlashcardId), ProgressRecord>,
    stats: HashMap<UserId, UserStats>,
    next_deck_id: u64,
    next_flashcard_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All state lives behind one mutex, which also gives `apply_attempt` the
/// same atomicity the SQLite transaction provides.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn recompute_stats_locked(state: &mut InMemoryState, user_id: UserId) -> UserStats {
        let records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        let derived = DerivedStats::from_records(&records);
        let mut stats = state
            .stats
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserStats::zeroed(user_id));
        stats.apply_derived(&derived);
        state.stats.insert(user_id, stats.clone());
        stats
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut state = self.lock()?;
        state.next_deck_id += 1;
        let id = DeckId::new(state.next_deck_id);
        let stored = Deck::new(
            id,
            deck.user_id,
            deck.title,
            deck.description,
            deck.subject,
            deck.category,
            deck.difficulty,
            deck.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.decks.insert(id, stored);
        Ok(id)
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.decks.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let state = self.lock()?;
        Ok(state.decks.get(&id).cloned())
    }

    async fn list_decks(&self, user_id: UserId) -> Result<Vec<Deck>, StorageError> {
        let state = self.lock()?;
        let mut decks: Vec<Deck> = state
            .decks
            .values()
            .filter(|d| d.user_id() == user_id)
            .cloned()
            .collect();
        decks.sort_by_key(|d| d.id().value());
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.decks.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        state.flashcards.retain(|_, card| card.deck_id() != id);
        state.progress.retain(|_, record| record.deck_id() != id);
        Ok(())
    }
}

#[async_trait]
impl FlashcardRepository for InMemoryRepository {
    async fn insert_new_flashcard(
        &self,
        card: NewFlashcardRecord,
    ) -> Result<FlashcardId, StorageError> {
        let mut state = self.lock()?;
        state.next_flashcard_id += 1;
        let id = FlashcardId::new(state.next_flashcard_id);
        let stored = Flashcard::new(
            id,
            card.deck_id,
            card.front_text,
            card.back_text,
            card.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.flashcards.insert(id, stored);
        Ok(id)
    }

    async fn upsert_flashcard(&self, card: &Flashcard) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.flashcards.insert(card.id(), card.clone());
        Ok(())
    }

    async fn get_flashcard(&self, id: FlashcardId) -> Result<Option<Flashcard>, StorageError> {
        let state = self.lock()?;
        Ok(state.flashcards.get(&id).cloned())
    }

    async fn list_flashcards(&self, deck_id: DeckId) -> Result<Vec<Flashcard>, StorageError> {
        let state = self.lock()?;
        let mut cards: Vec<Flashcard> = state
            .flashcards
            .values()
            .filter(|c| c.deck_id() == deck_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.id().value());
        Ok(cards)
    }

    async fn delete_flashcard(&self, id: FlashcardId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.flashcards.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        state.progress.retain(|_, record| record.flashcard_id() != id);
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.progress.get(&(user_id, flashcard_id)).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.flashcard_id().value());
        Ok(records)
    }

    async fn list_for_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.user_id() == user_id && r.deck_id() == deck_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.flashcard_id().value());
        Ok(records)
    }

    async fn delete_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if state.progress.remove(&(user_id, flashcard_id)).is_none() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for InMemoryRepository {
    async fn get_stats(&self, user_id: UserId) -> Result<Option<UserStats>, StorageError> {
        let state = self.lock()?;
        Ok(state.stats.get(&user_id).cloned())
    }

    async fn upsert_stats(&self, stats: &UserStats) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.stats.insert(stats.user_id(), stats.clone());
        Ok(())
    }
}

#[async_trait]
impl AttemptPersistence for InMemoryRepository {
    async fn apply_attempt(
        &self,
        record: &ProgressRecord,
        expected_study_count: Option<u32>,
    ) -> Result<UserStats, StorageError> {
        let mut state = self.lock()?;
        let key = (record.user_id(), record.flashcard_id());

        match expected_study_count {
            None => {
                if state.progress.contains_key(&key) {
                    return Err(StorageError::Conflict);
                }
            }
            Some(expected) => match state.progress.get(&key) {
                Some(existing) if existing.study_count() == expected => {}
                _ => return Err(StorageError::Conflict),
            },
        }

        state.progress.insert(key, record.clone());
        Ok(Self::recompute_stats_locked(&mut state, record.user_id()))
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub flashcards: Arc<dyn FlashcardRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub attempts: Arc<dyn AttemptPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            decks: Arc::new(repo.clone()),
            flashcards: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            stats: Arc::new(repo.clone()),
            attempts: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
