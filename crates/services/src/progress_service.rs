use flashlearn_core::model::{
    DeckId, FlashcardId, ProgressRecord, UserId, UserStats,
};
use flashlearn_core::scheduler::Scheduler;
use flashlearn_core::time::Clock;
use storage::repository::{Storage, StorageError};

use crate::error::ProgressServiceError;
use crate::stats_service::recompute_user_stats;

/// How many conflicting writes one attempt tolerates before giving up.
///
/// Every conflict means a competing attempt committed, so in practice the
/// loop settles after a handful of rounds even under heavy contention.
const MAX_ATTEMPT_RETRIES: u32 = 16;

//
// ─── RECORDED ATTEMPT ──────────────────────────────────────────────────────────
//

/// Result of one reported attempt: the updated progress record and the user
/// stats recomputed in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAttempt {
    pub record: ProgressRecord,
    pub stats: UserStats,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records study attempts and serves progress queries.
///
/// The service verifies the deck/flashcard collaborators, drives the pure
/// scheduler transition, and retries the optimistic write until it lands,
/// so concurrent attempts against the same record never lose updates.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    scheduler: Scheduler,
    storage: Storage,
}

impl ProgressService {
    /// Creates a service with the standard review policy and real-time clock.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
            storage,
        }
    }

    /// Override the scheduler (usually to inject a custom review policy).
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Record one study attempt for a flashcard.
    ///
    /// Loads or lazily creates the progress record for (user, flashcard),
    /// applies the scheduling transition, and persists the record together
    /// with freshly recomputed user stats in one transaction. A conflicting
    /// concurrent writer triggers a reload-and-retry, so a racing first
    /// attempt becomes an update instead of an error.
    ///
    /// # Errors
    ///
    /// - `DeckNotFound` / `FlashcardNotFound` if the referenced collaborators
    ///   are missing or not owned by the caller.
    /// - `Scheduler` if `time_spent_minutes` is negative or non-finite.
    /// - `RetriesExhausted` if the write keeps conflicting.
    /// - `Storage` for other persistence failures.
    pub async fn record_attempt(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        flashcard_id: FlashcardId,
        was_correct: bool,
        time_spent_minutes: f64,
    ) -> Result<RecordedAttempt, ProgressServiceError> {
        let deck = self
            .storage
            .decks
            .get_deck(deck_id)
            .await?
            .filter(|d| d.user_id() == user_id)
            .ok_or(ProgressServiceError::DeckNotFound)?;
        self.storage
            .flashcards
            .get_flashcard(flashcard_id)
            .await?
            .filter(|c| c.deck_id() == deck.id())
            .ok_or(ProgressServiceError::FlashcardNotFound)?;

        for round in 0..MAX_ATTEMPT_RETRIES {
            let now = self.clock.now();
            let existing = self
                .storage
                .progress
                .get_progress(user_id, flashcard_id)
                .await?;
            let expected = existing.as_ref().map(ProgressRecord::study_count);
            let mut record = existing
                .unwrap_or_else(|| ProgressRecord::started(user_id, deck_id, flashcard_id, now));

            self.scheduler
                .apply_attempt(&mut record, was_correct, time_spent_minutes, now)?;

            match self.storage.attempts.apply_attempt(&record, expected).await {
                Ok(stats) => return Ok(RecordedAttempt { record, stats }),
                Err(StorageError::Conflict) => {
                    tracing::debug!(
                        round,
                        %user_id,
                        %flashcard_id,
                        "concurrent attempt write, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::warn!(%user_id, %flashcard_id, "attempt write kept conflicting");
        Err(ProgressServiceError::RetriesExhausted {
            retries: MAX_ATTEMPT_RETRIES,
        })
    }

    /// List every progress record the user owns.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let records = self.storage.progress.list_for_user(user_id).await?;
        Ok(records)
    }

    /// List the user's progress records for one deck.
    ///
    /// # Errors
    ///
    /// Returns `DeckNotFound` if the deck is missing or owned by someone
    /// else, `Storage` on repository failures.
    pub async fn progress_for_deck(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        self.storage
            .decks
            .get_deck(deck_id)
            .await?
            .filter(|d| d.user_id() == user_id)
            .ok_or(ProgressServiceError::DeckNotFound)?;
        let records = self.storage.progress.list_for_deck(user_id, deck_id).await?;
        Ok(records)
    }

    /// Fetch the user's progress record for one flashcard, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_flashcard(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<Option<ProgressRecord>, ProgressServiceError> {
        let record = self
            .storage
            .progress
            .get_progress(user_id, flashcard_id)
            .await?;
        Ok(record)
    }

    /// Delete the user's progress record for one flashcard and recompute the
    /// derived stats from the remaining records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressNotFound` if no record exists, `Storage` on
    /// repository failures.
    pub async fn delete_progress(
        &self,
        user_id: UserId,
        flashcard_id: FlashcardId,
    ) -> Result<(), ProgressServiceError> {
        match self
            .storage
            .progress
            .delete_progress(user_id, flashcard_id)
            .await
        {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(ProgressServiceError::ProgressNotFound),
            Err(err) => return Err(err.into()),
        }
        recompute_user_stats(&self.storage, user_id).await?;
        Ok(())
    }
}
