//! Shared error types for the services crate.

use thiserror::Error;

use flashlearn_core::model::{DeckError, FlashcardError};
use flashlearn_core::scheduler::SchedulerError;
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("deck not found")]
    DeckNotFound,
    #[error("flashcard not found")]
    FlashcardNotFound,
    #[error("no progress recorded for this flashcard")]
    ProgressNotFound,
    #[error("attempt dropped after {retries} conflicting writes")]
    RetriesExhausted { retries: u32 },
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DeckService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error("deck not found")]
    NotFound,
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FlashcardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardServiceError {
    #[error("deck not found")]
    DeckNotFound,
    #[error("flashcard not found")]
    NotFound,
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
