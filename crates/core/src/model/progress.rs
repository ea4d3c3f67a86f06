use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{DeckId, FlashcardId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when rebuilding a progress record from persisted state.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("attempt counters disagree: {correct} correct + {incorrect} incorrect != {total} studied")]
    CounterMismatch {
        correct: u32,
        incorrect: u32,
        total: u32,
    },

    #[error("next review {next_review_at} precedes last study {last_studied_at}")]
    ReviewBeforeStudy {
        last_studied_at: DateTime<Utc>,
        next_review_at: DateTime<Utc>,
    },

    #[error("total study time must be non-negative and finite, got {provided}")]
    InvalidStudyTime { provided: f64 },
}

//
// ─── REVIEW STATUS ─────────────────────────────────────────────────────────────
//

/// Lifecycle stage of a flashcard's mastery for one user.
///
/// Cards start as `New`, fall back to `Learning` after repeated misses, move
/// to `Reviewing` once answers stick, and end `Mastered` when the correct
/// streak clears the mastery threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    New,
    Learning,
    Reviewing,
    Mastered,
}

impl ReviewStatus {
    /// Stable string form used by storage and exposed records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::New => "new",
            ReviewStatus::Learning => "learning",
            ReviewStatus::Reviewing => "reviewing",
            ReviewStatus::Mastered => "mastered",
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Per-(user, flashcard) study history and scheduling state.
///
/// One record exists per user/flashcard pair; it is created lazily on the
/// first reported attempt and mutated by every one after that. The record
/// references its deck and flashcard but owns neither.
///
/// Invariants upheld by every constructor and mutation:
/// - `correct_attempts + incorrect_attempts == study_count`
/// - `next_review_at >= last_studied_at`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRecord {
    user_id: UserId,
    deck_id: DeckId,
    flashcard_id: FlashcardId,
    study_count: u32,
    correct_attempts: u32,
    incorrect_attempts: u32,
    total_study_time: f64,
    last_studied_at: DateTime<Utc>,
    next_review_at: DateTime<Utc>,
    review_status: ReviewStatus,
    is_learned: bool,
}

impl ProgressRecord {
    /// Creates the zeroed record for a pair that has never been studied.
    ///
    /// Counters start at zero, the status is `New`, and both timestamps are
    /// `now` until the first attempt is applied.
    #[must_use]
    pub fn started(
        user_id: UserId,
        deck_id: DeckId,
        flashcard_id: FlashcardId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            deck_id,
            flashcard_id,
            study_count: 0,
            correct_attempts: 0,
            incorrect_attempts: 0,
            total_study_time: 0.0,
            last_studied_at: now,
            next_review_at: now,
            review_status: ReviewStatus::New,
            is_learned: false,
        }
    }

    /// Rebuild a record from storage, re-checking the counter and scheduling
    /// invariants so a corrupt row cannot enter the domain.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the counters do not add up, the study time
    /// is negative or non-finite, or the next review precedes the last study.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        deck_id: DeckId,
        flashcard_id: FlashcardId,
        study_count: u32,
        correct_attempts: u32,
        incorrect_attempts: u32,
        total_study_time: f64,
        last_studied_at: DateTime<Utc>,
        next_review_at: DateTime<Utc>,
        review_status: ReviewStatus,
        is_learned: bool,
    ) -> Result<Self, ProgressError> {
        if u64::from(correct_attempts) + u64::from(incorrect_attempts) != u64::from(study_count) {
            return Err(ProgressError::CounterMismatch {
                correct: correct_attempts,
                incorrect: incorrect_attempts,
                total: study_count,
            });
        }
        if !total_study_time.is_finite() || total_study_time < 0.0 {
            return Err(ProgressError::InvalidStudyTime {
                provided: total_study_time,
            });
        }
        if next_review_at < last_studied_at {
            return Err(ProgressError::ReviewBeforeStudy {
                last_studied_at,
                next_review_at,
            });
        }

        Ok(Self {
            user_id,
            deck_id,
            flashcard_id,
            study_count,
            correct_attempts,
            incorrect_attempts,
            total_study_time,
            last_studied_at,
            next_review_at,
            review_status,
            is_learned,
        })
    }

    /// Fold one attempt into the record.
    ///
    /// Increments the attempt counters, accumulates study time, stamps
    /// `last_studied_at`, and adopts the scheduling decision computed by the
    /// scheduler. Callers go through [`crate::scheduler::Scheduler`], which
    /// validates the time input and derives `outcome` from the post-attempt
    /// counters.
    pub fn apply_attempt(
        &mut self,
        was_correct: bool,
        time_spent_minutes: f64,
        outcome: &crate::scheduler::AttemptOutcome,
        now: DateTime<Utc>,
    ) {
        self.study_count += 1;
        if was_correct {
            self.correct_attempts += 1;
        } else {
            self.incorrect_attempts += 1;
        }
        self.total_study_time += time_spent_minutes;
        self.last_studied_at = now;
        self.next_review_at = outcome.next_review_at;
        self.review_status = outcome.status;
        self.is_learned = outcome.status == ReviewStatus::Mastered;
    }

    // Accessors
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn flashcard_id(&self) -> FlashcardId {
        self.flashcard_id
    }

    #[must_use]
    pub fn study_count(&self) -> u32 {
        self.study_count
    }

    #[must_use]
    pub fn correct_attempts(&self) -> u32 {
        self.correct_attempts
    }

    #[must_use]
    pub fn incorrect_attempts(&self) -> u32 {
        self.incorrect_attempts
    }

    /// Accumulated study time in minutes.
    #[must_use]
    pub fn total_study_time(&self) -> f64 {
        self.total_study_time
    }

    #[must_use]
    pub fn last_studied_at(&self) -> DateTime<Utc> {
        self.last_studied_at
    }

    #[must_use]
    pub fn next_review_at(&self) -> DateTime<Utc> {
        self.next_review_at
    }

    #[must_use]
    pub fn review_status(&self) -> ReviewStatus {
        self.review_status
    }

    #[must_use]
    pub fn is_learned(&self) -> bool {
        self.is_learned
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
