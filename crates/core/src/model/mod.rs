mod deck;
mod flashcard;
mod ids;
mod progress;
mod stats;

pub use ids::{DeckId, FlashcardId, UserId};

pub use deck::{Deck, DeckError};
pub use flashcard::{Flashcard, FlashcardError};
pub use progress::{ProgressError, ProgressRecord, ReviewStatus};
pub use stats::{DerivedStats, StatsPatch, UserStats, DEFAULT_TARGET_MINUTES_PER_CARD};
