use std::sync::Arc;

use flashlearn_core::model::{DeckId, FlashcardId, ReviewStatus, StatsPatch, UserId};
use flashlearn_core::scheduler::SchedulerError;
use flashlearn_core::time::{fixed_clock, fixed_now};
use services::{
    Clock, DashboardService, DeckService, FlashcardService, ProgressService,
    ProgressServiceError, StatsService,
};
use storage::repository::Storage;

struct Harness {
    storage: Storage,
    decks: DeckService,
    flashcards: FlashcardService,
    progress: ProgressService,
    stats: StatsService,
}

fn harness() -> Harness {
    let storage = Storage::in_memory();
    Harness {
        decks: DeckService::new(storage.clone()).with_clock(fixed_clock()),
        flashcards: FlashcardService::new(storage.clone()).with_clock(fixed_clock()),
        progress: ProgressService::new(storage.clone()).with_clock(fixed_clock()),
        stats: StatsService::new(storage.clone()),
        storage,
    }
}

async fn seed_deck_with_card(h: &Harness, user: UserId, title: &str) -> (DeckId, FlashcardId) {
    let deck_id = h
        .decks
        .create_deck(user, title.into(), None, None, None, 3)
        .await
        .unwrap();
    let card_id = h
        .flashcards
        .create_flashcard(user, deck_id, "Q".into(), "A".into())
        .await
        .unwrap();
    (deck_id, card_id)
}

#[tokio::test]
async fn first_attempt_creates_new_record_due_in_one_day() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let attempt = h
        .progress
        .record_attempt(user, deck_id, card_id, true, 2.0)
        .await
        .unwrap();

    assert_eq!(attempt.record.study_count(), 1);
    assert_eq!(attempt.record.correct_attempts(), 1);
    assert_eq!(attempt.record.incorrect_attempts(), 0);
    assert_eq!(attempt.record.total_study_time(), 2.0);
    assert_eq!(attempt.record.review_status(), ReviewStatus::New);
    assert!(!attempt.record.is_learned());
    assert_eq!(attempt.record.last_studied_at(), fixed_now());
    assert_eq!(
        attempt.record.next_review_at(),
        fixed_now() + chrono::Duration::days(1)
    );
}

#[tokio::test]
async fn correct_streak_progresses_through_reviewing_to_mastered() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let mut last = None;
    for _ in 0..3 {
        last = Some(
            h.progress
                .record_attempt(user, deck_id, card_id, true, 1.0)
                .await
                .unwrap(),
        );
    }
    let at_three = last.clone().unwrap();
    assert_eq!(at_three.record.review_status(), ReviewStatus::Reviewing);
    assert!(!at_three.record.is_learned());
    assert_eq!(
        at_three.record.next_review_at(),
        fixed_now() + chrono::Duration::days(3)
    );

    for _ in 0..2 {
        last = Some(
            h.progress
                .record_attempt(user, deck_id, card_id, true, 1.0)
                .await
                .unwrap(),
        );
    }
    let at_five = last.unwrap();
    assert_eq!(at_five.record.study_count(), 5);
    assert_eq!(at_five.record.review_status(), ReviewStatus::Mastered);
    assert!(at_five.record.is_learned());
    assert_eq!(
        at_five.record.next_review_at(),
        fixed_now() + chrono::Duration::days(7)
    );
    assert_eq!(at_five.stats.cards_mastered(), 1);
}

#[tokio::test]
async fn mastery_level_is_forty_for_four_of_ten() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_a) = seed_deck_with_card(&h, user, "Biology").await;
    let card_b = h
        .flashcards
        .create_flashcard(user, deck_id, "Q2".into(), "A2".into())
        .await
        .unwrap();

    for card in [card_a, card_b] {
        for _ in 0..2 {
            h.progress
                .record_attempt(user, deck_id, card, true, 1.0)
                .await
                .unwrap();
        }
        for _ in 0..3 {
            h.progress
                .record_attempt(user, deck_id, card, false, 1.0)
                .await
                .unwrap();
        }
    }

    let stats = h.stats.get(user).await.unwrap();
    assert_eq!(stats.mastery_level(), 40.0);
    assert_eq!(stats.retention_rate(), 40.0);
}

#[tokio::test]
async fn stats_reads_are_idempotent_without_new_attempts() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    h.progress
        .record_attempt(user, deck_id, card_id, true, 1.5)
        .await
        .unwrap();

    let first = h.stats.get(user).await.unwrap();
    let second = h.stats.get(user).await.unwrap();
    assert_eq!(first, second);

    let recomputed = h.stats.recompute(user).await.unwrap();
    assert_eq!(first, recomputed);
}

#[tokio::test]
async fn concurrent_attempts_lose_no_updates() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    const WRITERS: u32 = 8;
    let progress = Arc::new(h.progress.clone());
    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let progress = Arc::clone(&progress);
        handles.push(tokio::spawn(async move {
            progress
                .record_attempt(user, deck_id, card_id, true, 1.0)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let record = h
        .progress
        .progress_for_flashcard(user, card_id)
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(record.study_count(), WRITERS);
    assert_eq!(record.correct_attempts(), WRITERS);
    assert_eq!(record.incorrect_attempts(), 0);

    let stats = h.stats.get(user).await.unwrap();
    assert_eq!(stats.mastery_level(), 100.0);
}

#[tokio::test]
async fn unknown_collaborators_surface_not_found() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let err = h
        .progress
        .record_attempt(user, DeckId::new(999), card_id, true, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressServiceError::DeckNotFound));

    let err = h
        .progress
        .record_attempt(user, deck_id, FlashcardId::new(999), true, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressServiceError::FlashcardNotFound));

    // A deck owned by someone else is invisible to this caller.
    let stranger = UserId::new(2);
    let err = h
        .progress
        .record_attempt(stranger, deck_id, card_id, true, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressServiceError::DeckNotFound));
}

#[tokio::test]
async fn negative_time_is_rejected_before_any_write() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let err = h
        .progress
        .record_attempt(user, deck_id, card_id, true, -3.0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Scheduler(SchedulerError::InvalidTimeSpent { .. })
    ));

    assert!(h
        .progress
        .progress_for_flashcard(user, card_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn deleting_progress_recomputes_stats_from_remaining_records() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_a) = seed_deck_with_card(&h, user, "Biology").await;
    let card_b = h
        .flashcards
        .create_flashcard(user, deck_id, "Q2".into(), "A2".into())
        .await
        .unwrap();

    h.progress
        .record_attempt(user, deck_id, card_a, true, 1.0)
        .await
        .unwrap();
    h.progress
        .record_attempt(user, deck_id, card_b, false, 1.0)
        .await
        .unwrap();
    assert_eq!(h.stats.get(user).await.unwrap().mastery_level(), 50.0);

    h.progress.delete_progress(user, card_b).await.unwrap();
    assert_eq!(h.stats.get(user).await.unwrap().mastery_level(), 100.0);

    let err = h.progress.delete_progress(user, card_b).await.unwrap_err();
    assert!(matches!(err, ProgressServiceError::ProgressNotFound));
}

#[tokio::test]
async fn stats_patch_updates_only_named_fields() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    h.progress
        .record_attempt(user, deck_id, card_id, true, 1.0)
        .await
        .unwrap();

    let updated = h
        .stats
        .update(
            user,
            &StatsPatch {
                weekly_goal: Some(30),
                study_streak: Some(7),
                ..StatsPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.weekly_goal(), 30);
    assert_eq!(updated.study_streak(), 7);
    assert_eq!(updated.mastery_level(), 100.0);

    // A later recompute refreshes the derived fields and keeps the goal.
    let recomputed = h.stats.recompute(user).await.unwrap();
    assert_eq!(recomputed.weekly_goal(), 30);
    assert_eq!(recomputed.study_streak(), 7);
    assert_eq!(recomputed.mastery_level(), 100.0);
}

#[tokio::test]
async fn exposed_records_serialize_with_iso8601_timestamps() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let attempt = h
        .progress
        .record_attempt(user, deck_id, card_id, true, 2.0)
        .await
        .unwrap();

    let json = serde_json::to_value(&attempt.record).unwrap();
    assert_eq!(json["flashcard_id"], 1);
    assert_eq!(json["review_status"], "new");
    assert_eq!(json["last_studied_at"], "2023-11-14T22:13:20Z");
    assert_eq!(json["next_review_at"], "2023-11-15T22:13:20Z");

    let json = serde_json::to_value(&attempt.stats).unwrap();
    assert_eq!(json["mastery_level"], 100.0);
}

#[tokio::test]
async fn full_flow_works_against_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_service_smoke?mode=memory&cache=shared")
        .await
        .expect("sqlite storage");
    let decks = DeckService::new(storage.clone()).with_clock(fixed_clock());
    let flashcards = FlashcardService::new(storage.clone()).with_clock(fixed_clock());
    let progress = ProgressService::new(storage.clone()).with_clock(fixed_clock());
    let dashboard = DashboardService::new(storage);

    let user = UserId::new(1);
    let deck_id = decks
        .create_deck(user, "Chemistry".into(), None, None, None, 2)
        .await
        .unwrap();
    let card_id = flashcards
        .create_flashcard(user, deck_id, "H2O?".into(), "Water".into())
        .await
        .unwrap();

    for _ in 0..3 {
        progress
            .record_attempt(user, deck_id, card_id, true, 0.5)
            .await
            .unwrap();
    }

    let view = dashboard.view(user).await.unwrap();
    assert_eq!(view.total_flashcards_studied, 3);
    assert_eq!(view.most_reviewed_deck.as_deref(), Some("Chemistry"));
    assert_eq!(view.mastery_level, 100.0);
    assert_eq!(view.focus_score, 50.0);
}

#[tokio::test]
async fn clock_injection_controls_scheduling_output() {
    let h = harness();
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_with_card(&h, user, "Biology").await;

    let later = fixed_now() + chrono::Duration::days(10);
    let progress = ProgressService::new(h.storage.clone()).with_clock(Clock::fixed(later));

    let attempt = progress
        .record_attempt(user, deck_id, card_id, true, 1.0)
        .await
        .unwrap();
    assert_eq!(attempt.record.last_studied_at(), later);
    assert_eq!(
        attempt.record.next_review_at(),
        later + chrono::Duration::days(1)
    );
}
