/// End-to-end walks through the card state machine using the default FSRS
/// policy with fuzz disabled.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use recall_core::{
    new_v7, Card, CardLifecycle, CardState, FsrsScheduler, Rating, SchedulerConfig,
};

fn lifecycle() -> CardLifecycle {
    CardLifecycle::new(Arc::new(FsrsScheduler::new(SchedulerConfig {
        enable_fuzzing: false,
        ..SchedulerConfig::default()
    })))
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn review_at_due(lc: &CardLifecycle, card: &Card, rating: Rating) -> Card {
    let (next, log) = lc.review(card, rating, card.due, None).unwrap();
    assert_eq!(log.rating, rating);
    next
}

#[test]
fn test_new_card_easy_graduates_to_review() {
    let lc = lifecycle();
    let now = start();
    let card = lc.create(new_v7(), now);

    let (next, _) = lc.review(&card, Rating::Easy, now, None).unwrap();

    assert_eq!(next.state, CardState::Review);
    assert!(next.due > now, "graduated card must not be immediately due");
    assert!(next.stability.is_some());
    assert!(next.difficulty.is_some());
    assert!(next.step.is_none());
}

#[test]
fn test_learning_ladder_then_graduation() {
    let lc = lifecycle();
    let mut card = lc.create(new_v7(), start());

    let expected_steps = [Some(1), Some(2), Some(3)];
    for expected in expected_steps {
        card = review_at_due(&lc, &card, Rating::Good);
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step, expected);
        assert!(card.stability.is_none(), "memory state before graduation");
        assert!(card.difficulty.is_none());
    }

    card = review_at_due(&lc, &card, Rating::Good);
    assert_eq!(card.state, CardState::Review);
    assert!(card.step.is_none());
    assert!(card.stability.is_some());
    assert!(card.difficulty.is_some());
}

#[test]
fn test_lapse_and_relearning_cycle() {
    let lc = lifecycle();
    let now = start();
    let card = lc.create(new_v7(), now);
    let (mut card, _) = lc.review(&card, Rating::Easy, now, None).unwrap();
    let stability_before = card.stability.unwrap();

    card = review_at_due(&lc, &card, Rating::Again);
    assert_eq!(card.state, CardState::Relearning);
    assert_eq!(card.step, Some(0));
    assert!(card.stability.unwrap() < stability_before);

    // Five relearning steps: four advances, then graduation.
    for expected in 1..=4 {
        card = review_at_due(&lc, &card, Rating::Good);
        assert_eq!(card.state, CardState::Relearning);
        assert_eq!(card.step, Some(expected));
    }
    card = review_at_due(&lc, &card, Rating::Good);
    assert_eq!(card.state, CardState::Review);
}

#[test]
fn test_last_review_null_iff_new() {
    let lc = lifecycle();
    let now = start();
    let card = lc.create(new_v7(), now);
    assert_eq!(card.state, CardState::New);
    assert!(card.last_review.is_none());

    for rating in Rating::ALL {
        let (next, _) = lc.review(&card, rating, now, Some(4_000)).unwrap();
        assert_ne!(next.state, CardState::New);
        assert_eq!(next.last_review, Some(now));
        assert!(next.due >= now);
    }
}

#[test]
fn test_review_interval_capped_at_maximum() {
    let lc = lifecycle();
    let mut card = lc.create(new_v7(), start());
    for _ in 0..12 {
        card = review_at_due(&lc, &card, Rating::Easy);
        let last = card.last_review.unwrap();
        assert!(card.due - last <= Duration::days(14));
    }
}
