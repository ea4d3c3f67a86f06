use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;
use crate::model::progress::{ProgressRecord, ReviewStatus};

/// Target minutes a user should spend per attempt; the focus score is the
/// actual average expressed as a percentage of this.
pub const DEFAULT_TARGET_MINUTES_PER_CARD: f64 = 1.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//
// ─── DERIVED STATS ─────────────────────────────────────────────────────────────
//

/// The recomputable slice of [`UserStats`]: a pure aggregate over every
/// progress record a user owns.
///
/// Keeping this separate from the stored row means the derived fields can
/// never drift from their inputs — storage always overwrites them wholesale
/// via [`UserStats::apply_derived`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub mastery_level: f64,
    pub retention_rate: f64,
    pub focus_score: f64,
    pub cards_mastered: u32,
}

impl DerivedStats {
    /// Aggregates with the default one-minute-per-card focus target.
    #[must_use]
    pub fn from_records(records: &[ProgressRecord]) -> Self {
        Self::from_records_with_target(records, DEFAULT_TARGET_MINUTES_PER_CARD)
    }

    /// Aggregates a user's records into their derived metrics.
    ///
    /// - mastery = 100 × total correct / total attempts, 2 decimal places;
    ///   an empty or unstudied record set reports 0% rather than erroring.
    /// - retention currently mirrors mastery; the field stays separate so the
    ///   two can diverge later without a schema change.
    /// - focus = 100 × (average minutes per attempt) / target, 2 decimal
    ///   places, 0 when nothing was attempted.
    #[must_use]
    pub fn from_records_with_target(
        records: &[ProgressRecord],
        target_minutes_per_card: f64,
    ) -> Self {
        let total_correct: u64 = records.iter().map(|r| u64::from(r.correct_attempts())).sum();
        let total_attempts: u64 = records.iter().map(|r| u64::from(r.study_count())).sum();
        let total_study_time: f64 = records.iter().map(ProgressRecord::total_study_time).sum();
        let cards_mastered = records
            .iter()
            .filter(|r| r.review_status() == ReviewStatus::Mastered)
            .count();

        #[allow(clippy::cast_precision_loss)]
        let attempts_divisor = total_attempts.max(1) as f64;
        #[allow(clippy::cast_precision_loss)]
        let mastery_level = round2(100.0 * total_correct as f64 / attempts_divisor);

        let focus_score = if total_attempts == 0 {
            0.0
        } else {
            round2(100.0 * (total_study_time / attempts_divisor) / target_minutes_per_card)
        };

        Self {
            mastery_level,
            retention_rate: mastery_level,
            focus_score,
            cards_mastered: u32::try_from(cards_mastered).unwrap_or(u32::MAX),
        }
    }
}

//
// ─── USER STATS ────────────────────────────────────────────────────────────────
//

/// Per-user rollup metrics.
///
/// `mastery_level`, `retention_rate`, `focus_score`, and `cards_mastered`
/// are a materialized view over the user's progress records; everything else
/// (`weekly_goal`, `study_streak`, `minutes_per_day`, `accuracy`) is owned by
/// the user and only changes through [`StatsPatch`] updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    user_id: UserId,
    mastery_level: f64,
    retention_rate: f64,
    focus_score: f64,
    study_streak: u32,
    weekly_goal: u32,
    minutes_per_day: f64,
    cards_mastered: u32,
    accuracy: f64,
}

impl UserStats {
    /// The zero-valued row created lazily on a user's first access or attempt.
    #[must_use]
    pub fn zeroed(user_id: UserId) -> Self {
        Self {
            user_id,
            mastery_level: 0.0,
            retention_rate: 0.0,
            focus_score: 0.0,
            study_streak: 0,
            weekly_goal: 0,
            minutes_per_day: 0.0,
            cards_mastered: 0,
            accuracy: 0.0,
        }
    }

    /// Rebuild a stats row from storage.
    ///
    /// Settable fields carry no invariants by design (goal-setting policy
    /// belongs to callers), so this cannot fail.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        mastery_level: f64,
        retention_rate: f64,
        focus_score: f64,
        study_streak: u32,
        weekly_goal: u32,
        minutes_per_day: f64,
        cards_mastered: u32,
        accuracy: f64,
    ) -> Self {
        Self {
            user_id,
            mastery_level,
            retention_rate,
            focus_score,
            study_streak,
            weekly_goal,
            minutes_per_day,
            cards_mastered,
            accuracy,
        }
    }

    /// Overwrite the derived fields from a fresh aggregation, leaving the
    /// user-settable fields alone.
    pub fn apply_derived(&mut self, derived: &DerivedStats) {
        self.mastery_level = derived.mastery_level;
        self.retention_rate = derived.retention_rate;
        self.focus_score = derived.focus_score;
        self.cards_mastered = derived.cards_mastered;
    }

    /// Merge a partial update: every present field overwrites, absent fields
    /// stay as stored. Values are taken as-is; only type correctness is
    /// enforced.
    pub fn apply_patch(&mut self, patch: &StatsPatch) {
        if let Some(weekly_goal) = patch.weekly_goal {
            self.weekly_goal = weekly_goal;
        }
        if let Some(mastery_level) = patch.mastery_level {
            self.mastery_level = mastery_level;
        }
        if let Some(study_streak) = patch.study_streak {
            self.study_streak = study_streak;
        }
        if let Some(focus_score) = patch.focus_score {
            self.focus_score = focus_score;
        }
        if let Some(retention_rate) = patch.retention_rate {
            self.retention_rate = retention_rate;
        }
        if let Some(cards_mastered) = patch.cards_mastered {
            self.cards_mastered = cards_mastered;
        }
        if let Some(minutes_per_day) = patch.minutes_per_day {
            self.minutes_per_day = minutes_per_day;
        }
        if let Some(accuracy) = patch.accuracy {
            self.accuracy = accuracy;
        }
    }

    // Accessors
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn mastery_level(&self) -> f64 {
        self.mastery_level
    }

    #[must_use]
    pub fn retention_rate(&self) -> f64 {
        self.retention_rate
    }

    #[must_use]
    pub fn focus_score(&self) -> f64 {
        self.focus_score
    }

    #[must_use]
    pub fn study_streak(&self) -> u32 {
        self.study_streak
    }

    #[must_use]
    pub fn weekly_goal(&self) -> u32 {
        self.weekly_goal
    }

    #[must_use]
    pub fn minutes_per_day(&self) -> f64 {
        self.minutes_per_day
    }

    #[must_use]
    pub fn cards_mastered(&self) -> u32 {
        self.cards_mastered
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }
}

//
// ─── STATS PATCH ───────────────────────────────────────────────────────────────
//

/// Partial-update request for [`UserStats`]; `None` means "leave untouched".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsPatch {
    pub weekly_goal: Option<u32>,
    pub mastery_level: Option<f64>,
    pub study_streak: Option<u32>,
    pub focus_score: Option<f64>,
    pub retention_rate: Option<f64>,
    pub cards_mastered: Option<u32>,
    pub minutes_per_day: Option<f64>,
    pub accuracy: Option<f64>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeckId, FlashcardId};
    use crate::scheduler::Scheduler;
    use crate::time::fixed_now;

    fn record_with(correct: u32, incorrect: u32, minutes_per_attempt: f64) -> ProgressRecord {
        let scheduler = Scheduler::new();
        let mut record = ProgressRecord::started(
            UserId::new(1),
            DeckId::new(1),
            FlashcardId::new(u64::from(correct) * 100 + u64::from(incorrect)),
            fixed_now(),
        );
        for _ in 0..correct {
            scheduler
                .apply_attempt(&mut record, true, minutes_per_attempt, fixed_now())
                .unwrap();
        }
        for _ in 0..incorrect {
            scheduler
                .apply_attempt(&mut record, false, minutes_per_attempt, fixed_now())
                .unwrap();
        }
        record
    }

    #[test]
    fn empty_record_set_reports_zero_not_error() {
        let derived = DerivedStats::from_records(&[]);
        assert_eq!(derived.mastery_level, 0.0);
        assert_eq!(derived.retention_rate, 0.0);
        assert_eq!(derived.focus_score, 0.0);
        assert_eq!(derived.cards_mastered, 0);
    }

    #[test]
    fn mastery_is_correct_over_total_attempts() {
        // 4 correct out of 10 attempts across two records -> 40.00.
        let records = vec![record_with(2, 3, 1.0), record_with(2, 3, 1.0)];
        let derived = DerivedStats::from_records(&records);

        assert_eq!(derived.mastery_level, 40.0);
        assert_eq!(derived.retention_rate, 40.0);
    }

    #[test]
    fn mastery_rounds_to_two_decimals() {
        // 1 correct out of 3 attempts -> 33.333...% -> 33.33.
        let records = vec![record_with(1, 2, 1.0)];
        let derived = DerivedStats::from_records(&records);
        assert_eq!(derived.mastery_level, 33.33);
    }

    #[test]
    fn focus_score_is_average_time_against_target() {
        // 2 minutes per attempt against a 1-minute target -> 200%.
        let records = vec![record_with(3, 1, 2.0)];
        let derived = DerivedStats::from_records(&records);
        assert_eq!(derived.focus_score, 200.0);

        let derived = DerivedStats::from_records_with_target(&records, 4.0);
        assert_eq!(derived.focus_score, 50.0);
    }

    #[test]
    fn cards_mastered_counts_mastered_records_only() {
        let records = vec![
            record_with(5, 0, 1.0),
            record_with(5, 2, 1.0),
            record_with(3, 0, 1.0),
            record_with(0, 1, 1.0),
        ];
        let derived = DerivedStats::from_records(&records);
        assert_eq!(derived.cards_mastered, 2);
    }

    #[test]
    fn apply_derived_preserves_settable_fields() {
        let mut stats = UserStats::zeroed(UserId::new(1));
        stats.apply_patch(&StatsPatch {
            weekly_goal: Some(50),
            study_streak: Some(4),
            minutes_per_day: Some(15.0),
            ..StatsPatch::default()
        });

        let records = vec![record_with(2, 3, 1.0), record_with(2, 3, 1.0)];
        stats.apply_derived(&DerivedStats::from_records(&records));

        assert_eq!(stats.mastery_level(), 40.0);
        assert_eq!(stats.weekly_goal(), 50);
        assert_eq!(stats.study_streak(), 4);
        assert_eq!(stats.minutes_per_day(), 15.0);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut stats = UserStats::zeroed(UserId::new(1));
        stats.apply_derived(&DerivedStats {
            mastery_level: 75.0,
            retention_rate: 75.0,
            focus_score: 120.0,
            cards_mastered: 3,
        });

        stats.apply_patch(&StatsPatch {
            weekly_goal: Some(20),
            ..StatsPatch::default()
        });

        assert_eq!(stats.weekly_goal(), 20);
        assert_eq!(stats.mastery_level(), 75.0);
        assert_eq!(stats.focus_score(), 120.0);
        assert_eq!(stats.cards_mastered(), 3);
    }

    #[test]
    fn patch_deserializes_with_absent_fields() {
        let patch: StatsPatch = serde_json::from_str(r#"{"weekly_goal": 30}"#).unwrap();
        assert_eq!(patch.weekly_goal, Some(30));
        assert_eq!(patch.mastery_level, None);
    }
}
