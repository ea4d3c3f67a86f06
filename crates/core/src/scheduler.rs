use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{ProgressRecord, ReviewStatus};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("time spent must be non-negative and finite, got {provided}")]
    InvalidTimeSpent { provided: f64 },
}

/// Errors raised when building a custom [`ReviewPolicy`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("thresholds must be > 0")]
    ZeroThreshold,

    #[error("mastery threshold must be greater than the reviewing threshold")]
    ThresholdsNotAscending,

    #[error("review intervals must be positive")]
    NonPositiveInterval,
}

//
// ─── REVIEW POLICY ─────────────────────────────────────────────────────────────
//

/// Thresholds and intervals that drive review-status transitions.
///
/// The policy is evaluated as an ordered rule chain, first match wins:
///
/// 1. `correct_attempts >= mastered_after_correct` → mastered
/// 2. `correct_attempts >= reviewing_after_correct` → reviewing
/// 3. `incorrect_attempts >= learning_after_incorrect` → learning
/// 4. otherwise → new
///
/// Each rule carries the interval until the card resurfaces. Thresholds are
/// configuration rather than literals so tests and callers can tighten or
/// relax the progression.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPolicy {
    mastered_after_correct: u32,
    reviewing_after_correct: u32,
    learning_after_incorrect: u32,
    mastered_interval: Duration,
    reviewing_interval: Duration,
    learning_interval: Duration,
    new_interval: Duration,
}

impl ReviewPolicy {
    /// The standard progression: mastered at 5 correct (+7 days), reviewing
    /// at 3 correct (+3 days), learning at 3 incorrect (+12 hours), new
    /// otherwise (+1 day).
    #[must_use]
    pub fn standard() -> Self {
        Self {
            mastered_after_correct: 5,
            reviewing_after_correct: 3,
            learning_after_incorrect: 3,
            mastered_interval: Duration::days(7),
            reviewing_interval: Duration::days(3),
            learning_interval: Duration::hours(12),
            new_interval: Duration::days(1),
        }
    }

    /// Creates a custom policy.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError` if a threshold is zero, the mastery threshold
    /// does not exceed the reviewing threshold, or any interval is not
    /// strictly positive.
    pub fn new(
        mastered_after_correct: u32,
        reviewing_after_correct: u32,
        learning_after_incorrect: u32,
        mastered_interval: Duration,
        reviewing_interval: Duration,
        learning_interval: Duration,
        new_interval: Duration,
    ) -> Result<Self, PolicyError> {
        if mastered_after_correct == 0
            || reviewing_after_correct == 0
            || learning_after_incorrect == 0
        {
            return Err(PolicyError::ZeroThreshold);
        }
        if mastered_after_correct <= reviewing_after_correct {
            return Err(PolicyError::ThresholdsNotAscending);
        }
        let intervals = [
            mastered_interval,
            reviewing_interval,
            learning_interval,
            new_interval,
        ];
        if intervals.iter().any(|i| *i <= Duration::zero()) {
            return Err(PolicyError::NonPositiveInterval);
        }

        Ok(Self {
            mastered_after_correct,
            reviewing_after_correct,
            learning_after_incorrect,
            mastered_interval,
            reviewing_interval,
            learning_interval,
            new_interval,
        })
    }

    // Accessors
    #[must_use]
    pub fn mastered_after_correct(&self) -> u32 {
        self.mastered_after_correct
    }

    #[must_use]
    pub fn reviewing_after_correct(&self) -> u32 {
        self.reviewing_after_correct
    }

    #[must_use]
    pub fn learning_after_incorrect(&self) -> u32 {
        self.learning_after_incorrect
    }

    #[must_use]
    pub fn interval_for(&self, status: ReviewStatus) -> Duration {
        match status {
            ReviewStatus::Mastered => self.mastered_interval,
            ReviewStatus::Reviewing => self.reviewing_interval,
            ReviewStatus::Learning => self.learning_interval,
            ReviewStatus::New => self.new_interval,
        }
    }
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Scheduling decision for one attempt: the status the record moves to and
/// when the card should resurface.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub status: ReviewStatus,
    pub next_review_at: DateTime<Utc>,
}

/// Pure attempt-to-state transition driven by a [`ReviewPolicy`].
///
/// The scheduler owns no storage; it validates the attempt input, advances a
/// [`ProgressRecord`] in place, and reports the chosen schedule. Persistence
/// and retry concerns live with the caller.
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: ReviewPolicy,
}

impl Scheduler {
    /// Creates a scheduler with the standard policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(ReviewPolicy::standard())
    }

    /// Creates a scheduler with a custom policy.
    #[must_use]
    pub fn with_policy(policy: ReviewPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ReviewPolicy {
        &self.policy
    }

    /// Resolves the ordered policy rules against post-attempt counters.
    #[must_use]
    pub fn outcome_for(
        &self,
        correct_attempts: u32,
        incorrect_attempts: u32,
        now: DateTime<Utc>,
    ) -> AttemptOutcome {
        let status = if correct_attempts >= self.policy.mastered_after_correct {
            ReviewStatus::Mastered
        } else if correct_attempts >= self.policy.reviewing_after_correct {
            ReviewStatus::Reviewing
        } else if incorrect_attempts >= self.policy.learning_after_incorrect {
            ReviewStatus::Learning
        } else {
            ReviewStatus::New
        };

        AttemptOutcome {
            status,
            next_review_at: now + self.policy.interval_for(status),
        }
    }

    /// Fold one attempt into `record`: bump counters, accumulate study time,
    /// and reschedule according to the policy.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTimeSpent` if `time_spent_minutes` is
    /// negative or non-finite. The record is untouched on error.
    pub fn apply_attempt(
        &self,
        record: &mut ProgressRecord,
        was_correct: bool,
        time_spent_minutes: f64,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, SchedulerError> {
        if !time_spent_minutes.is_finite() || time_spent_minutes < 0.0 {
            return Err(SchedulerError::InvalidTimeSpent {
                provided: time_spent_minutes,
            });
        }

        let correct = record.correct_attempts() + u32::from(was_correct);
        let incorrect = record.incorrect_attempts() + u32::from(!was_correct);
        let outcome = self.outcome_for(correct, incorrect, now);

        record.apply_attempt(was_correct, time_spent_minutes, &outcome, now);
        Ok(outcome)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
