//! Repository behaviour against a live PostgreSQL.
//!
//! Skipped unless `DATABASE_URL` is set. Every test works on its own freshly
//! created notes, so the suite can share one database.

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use recall_db::test_fixtures::TestDatabase;
use recall_db::{
    CardLifecycle, CardRepository, CardState, ConceptRepository, Error, NoteRepository,
    NoteStatus, QuestionResult, Quiz, QuizCompletion, QuizQuestion, QuizRepository, QuizStatus,
    Rating,
};

fn active_quiz(concept_ids: &[Uuid]) -> Quiz {
    Quiz {
        id: recall_db::new_v7(),
        name: "Membranes".to_string(),
        status: QuizStatus::Active,
        questions: concept_ids
            .iter()
            .enumerate()
            .map(|(i, id)| QuizQuestion {
                concept_id: *id,
                question: format!("Question {}", i),
                answer: format!("Answer {}", i),
            })
            .collect(),
        results: None,
        created_at_utc: Utc::now(),
        completed_at_utc: None,
    }
}

fn results(n: usize, grade: Rating) -> Vec<QuestionResult> {
    (0..n)
        .map(|i| QuestionResult {
            response: format!("response {}", i),
            grade,
            feedback: "ok".to_string(),
        })
        .collect()
}

#[tokio::test]
async fn test_concurrent_claims_admit_exactly_one() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let note = test_db.pending_note().await;

    let attempts = join_all((0..4).map(|_| test_db.db.notes.claim_for_processing(note.id))).await;
    let wins = attempts.iter().filter(|r| r.is_ok()).count();
    let races = attempts
        .iter()
        .filter(|r| matches!(r, Err(Error::ConcurrencyRace(_))))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(races, 3);
    let stored = test_db.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(stored.status, NoteStatus::Processing);
}

#[tokio::test]
async fn test_claim_unknown_note() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let err = test_db
        .db
        .notes
        .claim_for_processing(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));
}

#[tokio::test]
async fn test_release_returns_note_to_pending() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let note = test_db.pending_note().await;
    test_db.db.notes.claim_for_processing(note.id).await.unwrap();
    test_db.db.notes.release_processing(note.id).await.unwrap();

    let stored = test_db.db.notes.fetch(note.id).await.unwrap();
    assert_eq!(stored.status, NoteStatus::Pending);
    assert!(test_db.db.concepts.list(Some(note.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_completed_processing_is_readable_in_order() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let (first, _) = test_db.note_with_concepts(&["Osmosis", "Diffusion"]).await;
    let (second, _) = test_db.note_with_concepts(&["Mitosis"]).await;

    let stored = test_db.db.notes.fetch(first.id).await.unwrap();
    assert_eq!(stored.status, NoteStatus::Processed);

    let joined = test_db
        .db
        .concepts
        .list_with_cards(&[second.id, first.id])
        .await
        .unwrap();
    let names: Vec<&str> = joined.iter().map(|c| c.concept.name.as_str()).collect();
    assert_eq!(names, vec!["Mitosis", "Osmosis", "Diffusion"]);
    assert!(joined.iter().all(|c| c.card.state == CardState::New));
    assert!(joined.iter().all(|c| c.card.last_review.is_none()));
}

#[tokio::test]
async fn test_delete_cascades_to_concepts_and_cards() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let (note, concepts) = test_db.note_with_concepts(&["Osmosis"]).await;
    test_db.db.notes.delete(note.id).await.unwrap();

    let err = test_db.db.concepts.get(concepts[0].concept.id).await.unwrap_err();
    assert!(matches!(err, Error::ConceptNotFound(_)));
    let err = test_db.db.notes.delete(note.id).await.unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));
}

#[tokio::test]
async fn test_concurrent_reviews_are_not_lost() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let (_, concepts) = test_db.note_with_concepts(&["Osmosis"]).await;
    let concept_id = concepts[0].concept.id;
    let lifecycle = CardLifecycle::default();

    let now = Utc::now();
    let reviews = join_all((0..5).map(|_| {
        test_db
            .db
            .cards
            .review_concept(concept_id, Rating::Good, now, &lifecycle)
    }))
    .await;
    assert!(reviews.iter().all(|r| r.is_ok()));

    let detail = test_db.db.concepts.get(concept_id).await.unwrap();
    assert_eq!(detail.review_logs.len(), 5);
    assert_ne!(detail.card.state, CardState::New);
    assert!(detail.card.last_review.is_some());
}

#[tokio::test]
async fn test_quiz_completes_exactly_once() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let (_, concepts) = test_db.note_with_concepts(&["Osmosis", "Diffusion"]).await;
    let ids: Vec<Uuid> = concepts.iter().map(|c| c.concept.id).collect();
    let quiz = active_quiz(&ids);
    test_db.db.quizzes.insert(&quiz).await.unwrap();

    let lifecycle = CardLifecycle::default();
    let completion = QuizCompletion {
        results: results(2, Rating::Easy),
        reviews: ids.iter().map(|id| (*id, Rating::Easy)).collect(),
        completed_at: Utc::now(),
    };

    let cards = test_db
        .db
        .quizzes
        .complete(quiz.id, completion.clone(), &lifecycle)
        .await
        .unwrap();
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c.state == CardState::Review));

    let err = test_db
        .db
        .quizzes
        .complete(quiz.id, completion, &lifecycle)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyCompleted(_)));

    let detail = test_db.db.concepts.get(ids[0]).await.unwrap();
    assert_eq!(detail.review_logs.len(), 1);

    let stored = test_db.db.quizzes.get(quiz.id).await.unwrap();
    assert_eq!(stored.status, QuizStatus::Completed);
    let stored_results = stored.results.unwrap();
    assert_eq!(stored_results.len(), 2);
    assert_eq!(stored.questions[1].answer, "Answer 1");

    let summary = test_db
        .db
        .quizzes
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|q| q.id == quiz.id)
        .unwrap();
    assert_eq!(summary.question_count, 2);
    assert_eq!(summary.total_score, Some(8));
}

#[tokio::test]
async fn test_quiz_count_mismatch_mutates_nothing() {
    let Some(test_db) = TestDatabase::connect().await else {
        return;
    };
    let (_, concepts) = test_db.note_with_concepts(&["Osmosis"]).await;
    let ids = vec![concepts[0].concept.id];
    let quiz = active_quiz(&ids);
    test_db.db.quizzes.insert(&quiz).await.unwrap();

    let err = test_db
        .db
        .quizzes
        .complete(
            quiz.id,
            QuizCompletion {
                results: results(3, Rating::Good),
                reviews: vec![(ids[0], Rating::Good)],
                completed_at: Utc::now(),
            },
            &CardLifecycle::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ResponseCountMismatch {
            expected: 1,
            actual: 3
        }
    ));

    let stored = test_db.db.quizzes.get(quiz.id).await.unwrap();
    assert_eq!(stored.status, QuizStatus::Active);
    assert!(stored.results.is_none());
    let detail = test_db.db.concepts.get(ids[0]).await.unwrap();
    assert!(detail.review_logs.is_empty());
}
