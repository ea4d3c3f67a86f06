#![forbid(unsafe_code)]

pub mod dashboard;
pub mod deck_service;
pub mod error;
pub mod flashcard_service;
pub mod progress_service;
pub mod stats_service;

pub use flashlearn_core::Clock;

pub use dashboard::{DashboardService, DashboardView, DeckStudySummary};
pub use deck_service::DeckService;
pub use error::{
    DashboardError, DeckServiceError, FlashcardServiceError, ProgressServiceError,
    StatsServiceError,
};
pub use flashcard_service::FlashcardService;
pub use progress_service::{ProgressService, RecordedAttempt};
pub use stats_service::StatsService;
