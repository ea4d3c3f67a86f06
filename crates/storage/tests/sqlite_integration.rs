use flashlearn_core::Scheduler;
use flashlearn_core::model::{
    DeckId, FlashcardId, ProgressRecord, ReviewStatus, StatsPatch, UserId, UserStats,
};
use flashlearn_core::time::fixed_now;
use storage::repository::{
    AttemptPersistence, DeckRepository, FlashcardRepository, NewDeckRecord, NewFlashcardRecord,
    ProgressRepository, StatsRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_deck_and_card(repo: &SqliteRepository, user: UserId) -> (DeckId, FlashcardId) {
    let deck_id = repo
        .insert_new_deck(NewDeckRecord {
            user_id: user,
            title: "Biology".into(),
            description: Some("cells".into()),
            subject: Some("science".into()),
            category: None,
            difficulty: 3,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    let card_id = repo
        .insert_new_flashcard(NewFlashcardRecord {
            deck_id,
            front_text: "What is a mitochondrion?".into(),
            back_text: "The powerhouse of the cell".into(),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    (deck_id, card_id)
}

fn record_after_attempts(
    user: UserId,
    deck_id: DeckId,
    card_id: FlashcardId,
    correct: u32,
    incorrect: u32,
) -> ProgressRecord {
    let scheduler = Scheduler::new();
    let mut record = ProgressRecord::started(user, deck_id, card_id, fixed_now());
    for _ in 0..correct {
        scheduler
            .apply_attempt(&mut record, true, 2.0, fixed_now())
            .unwrap();
    }
    for _ in 0..incorrect {
        scheduler
            .apply_attempt(&mut record, false, 2.0, fixed_now())
            .unwrap();
    }
    record
}

#[tokio::test]
async fn deck_and_flashcard_roundtrip() {
    let repo = connect("memdb_crud_roundtrip").await;
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_and_card(&repo, user).await;

    let deck = repo.get_deck(deck_id).await.unwrap().expect("deck");
    assert_eq!(deck.title(), "Biology");
    assert_eq!(deck.description(), Some("cells"));
    assert_eq!(deck.difficulty(), 3);
    assert_eq!(deck.user_id(), user);

    let card = repo.get_flashcard(card_id).await.unwrap().expect("card");
    assert_eq!(card.front_text(), "What is a mitochondrion?");
    assert_eq!(card.deck_id(), deck_id);

    let listed = repo.list_flashcards(deck_id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn apply_attempt_roundtrips_record_and_stats() {
    let repo = connect("memdb_attempt_roundtrip").await;
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_and_card(&repo, user).await;

    let record = record_after_attempts(user, deck_id, card_id, 1, 0);
    let stats = repo.apply_attempt(&record, None).await.unwrap();
    assert_eq!(stats.mastery_level(), 100.0);
    assert_eq!(stats.focus_score(), 200.0);

    let stored = repo.get_progress(user, card_id).await.unwrap().expect("row");
    assert_eq!(stored.study_count(), 1);
    assert_eq!(stored.correct_attempts(), 1);
    assert_eq!(stored.review_status(), ReviewStatus::New);
    assert_eq!(stored.last_studied_at(), fixed_now());
    assert_eq!(
        stored.next_review_at(),
        fixed_now() + chrono::Duration::days(1)
    );

    let persisted_stats = repo.get_stats(user).await.unwrap().expect("stats row");
    assert_eq!(persisted_stats, stats);
}

#[tokio::test]
async fn apply_attempt_rejects_racing_insert_and_stale_update() {
    let repo = connect("memdb_attempt_conflicts").await;
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_and_card(&repo, user).await;

    let first = record_after_attempts(user, deck_id, card_id, 1, 0);
    repo.apply_attempt(&first, None).await.unwrap();

    // Racing first insert for the same pair.
    let err = repo.apply_attempt(&first, None).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // Stale version predicate: stored study_count is 1, writer expects 0.
    let second = record_after_attempts(user, deck_id, card_id, 2, 0);
    let err = repo.apply_attempt(&second, Some(0)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // The matching expectation goes through.
    repo.apply_attempt(&second, Some(1)).await.unwrap();
    let stored = repo.get_progress(user, card_id).await.unwrap().unwrap();
    assert_eq!(stored.study_count(), 2);
}

#[tokio::test]
async fn failed_attempt_write_leaves_stats_untouched() {
    let repo = connect("memdb_attempt_atomicity").await;
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_and_card(&repo, user).await;

    let record = record_after_attempts(user, deck_id, card_id, 1, 0);
    repo.apply_attempt(&record, None).await.unwrap();
    let before = repo.get_stats(user).await.unwrap().unwrap();

    let stale = record_after_attempts(user, deck_id, card_id, 5, 0);
    let err = repo.apply_attempt(&stale, Some(4)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let after = repo.get_stats(user).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn deleting_a_deck_cascades_to_cards_and_progress() {
    let repo = connect("memdb_cascade").await;
    let user = UserId::new(1);
    let (deck_id, card_id) = seed_deck_and_card(&repo, user).await;

    let record = record_after_attempts(user, deck_id, card_id, 2, 1);
    repo.apply_attempt(&record, None).await.unwrap();

    repo.delete_deck(deck_id).await.unwrap();

    assert!(repo.get_deck(deck_id).await.unwrap().is_none());
    assert!(repo.get_flashcard(card_id).await.unwrap().is_none());
    assert!(repo.get_progress(user, card_id).await.unwrap().is_none());
}

#[tokio::test]
async fn stats_upsert_preserves_row_identity() {
    let repo = connect("memdb_stats_upsert").await;
    let user = UserId::new(9);

    let mut stats = UserStats::zeroed(user);
    stats.apply_patch(&StatsPatch {
        weekly_goal: Some(40),
        minutes_per_day: Some(25.0),
        ..StatsPatch::default()
    });
    repo.upsert_stats(&stats).await.unwrap();

    let stored = repo.get_stats(user).await.unwrap().expect("stats");
    assert_eq!(stored.weekly_goal(), 40);
    assert_eq!(stored.minutes_per_day(), 25.0);

    stats.apply_patch(&StatsPatch {
        weekly_goal: Some(10),
        ..StatsPatch::default()
    });
    repo.upsert_stats(&stats).await.unwrap();
    let stored = repo.get_stats(user).await.unwrap().expect("stats");
    assert_eq!(stored.weekly_goal(), 10);
    assert_eq!(stored.minutes_per_day(), 25.0);
}

#[tokio::test]
async fn list_for_deck_filters_by_user_and_deck() {
    let repo = connect("memdb_progress_lists").await;
    let user = UserId::new(1);
    let (deck_a, card_a) = seed_deck_and_card(&repo, user).await;
    let (deck_b, card_b) = seed_deck_and_card(&repo, user).await;

    repo.apply_attempt(&record_after_attempts(user, deck_a, card_a, 1, 0), None)
        .await
        .unwrap();
    repo.apply_attempt(&record_after_attempts(user, deck_b, card_b, 0, 1), None)
        .await
        .unwrap();

    let all = repo.list_for_user(user).await.unwrap();
    assert_eq!(all.len(), 2);

    let only_a = repo.list_for_deck(user, deck_a).await.unwrap();
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].flashcard_id(), card_a);

    let none = repo.list_for_user(UserId::new(2)).await.unwrap();
    assert!(none.is_empty());
}
