use std::collections::HashMap;

use serde::Serialize;

use flashlearn_core::model::{DeckId, UserId};
use storage::repository::Storage;

use crate::error::DashboardError;
use crate::stats_service::recompute_user_stats;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Study activity rolled up for one deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckStudySummary {
    pub deck_id: DeckId,
    pub deck_title: String,
    pub flashcards_studied: u64,
}

/// Read-only dashboard for one user: totals, the most-reviewed deck, and a
/// fresh stats snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub user_id: UserId,
    pub total_flashcards_studied: u64,
    pub most_reviewed_deck: Option<String>,
    pub decks: Vec<DeckStudySummary>,
    pub weekly_goal: u32,
    pub mastery_level: f64,
    pub study_streak: u32,
    pub focus_score: f64,
    pub retention_rate: f64,
    pub cards_mastered: u32,
    pub minutes_per_day: f64,
    pub accuracy: f64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Assembles the read-side dashboard from deck, progress, and stats data.
#[derive(Clone)]
pub struct DashboardService {
    storage: Storage,
}

impl DashboardService {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Build the dashboard for one user.
    ///
    /// Decks are rolled up in ID order; the most-reviewed title is chosen by
    /// strict comparison, so ties keep the earliest deck and a user with no
    /// studied cards gets `None`. The stats snapshot is recomputed on the
    /// way out, so this read path can never serve stale derived metrics.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if repository access fails.
    pub async fn view(&self, user_id: UserId) -> Result<DashboardView, DashboardError> {
        let decks = self.storage.decks.list_decks(user_id).await?;
        let records = self.storage.progress.list_for_user(user_id).await?;

        let mut per_deck: HashMap<DeckId, u64> = HashMap::new();
        for record in &records {
            *per_deck.entry(record.deck_id()).or_insert(0) += u64::from(record.study_count());
        }

        let mut total_flashcards_studied = 0;
        let mut most_reviewed_deck: Option<String> = None;
        let mut most_reviews = 0;
        let mut summaries = Vec::with_capacity(decks.len());

        for deck in &decks {
            let studied = per_deck.get(&deck.id()).copied().unwrap_or(0);
            total_flashcards_studied += studied;

            if studied > most_reviews {
                most_reviews = studied;
                most_reviewed_deck = Some(deck.title().to_owned());
            }

            summaries.push(DeckStudySummary {
                deck_id: deck.id(),
                deck_title: deck.title().to_owned(),
                flashcards_studied: studied,
            });
        }

        let stats = recompute_user_stats(&self.storage, user_id).await?;

        Ok(DashboardView {
            user_id,
            total_flashcards_studied,
            most_reviewed_deck,
            decks: summaries,
            weekly_goal: stats.weekly_goal(),
            mastery_level: stats.mastery_level(),
            study_streak: stats.study_streak(),
            focus_score: stats.focus_score(),
            retention_rate: stats.retention_rate(),
            cards_mastered: stats.cards_mastered(),
            minutes_per_day: stats.minutes_per_day(),
            // The live mastery figure doubles as accuracy on the dashboard;
            // the stored accuracy field only changes through explicit updates.
            accuracy: stats.mastery_level(),
        })
    }
}
