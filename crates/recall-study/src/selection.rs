//! Quiz concept selection and question allocation.

use chrono::{DateTime, Utc};

use recall_core::{ConceptWithCard, QuizMode};

/// Keep the concepts whose cards the mode admits, in retrieval order.
pub fn filter_by_mode(
    items: Vec<ConceptWithCard>,
    mode: QuizMode,
    now: DateTime<Utc>,
) -> Vec<ConceptWithCard> {
    items
        .into_iter()
        .filter(|item| mode.admits(&item.card, now))
        .collect()
}

/// Lowest stability first; unset stability counts as zero. Stable, so ties
/// keep retrieval order.
pub fn prioritize(items: &mut [ConceptWithCard]) {
    items.sort_by(|a, b| {
        a.card
            .priority_stability()
            .total_cmp(&b.card.priority_stability())
    });
}

/// Round-robin `question_limit` questions over `concept_count` concepts:
/// concept `i` gets one extra question while `i` is below the remainder.
pub fn allocate_questions(concept_count: usize, question_limit: usize) -> Vec<usize> {
    if concept_count == 0 {
        return Vec::new();
    }
    let base = question_limit / concept_count;
    let extra = question_limit % concept_count;
    (0..concept_count)
        .map(|i| base + usize::from(i < extra))
        .collect()
}

/// Filter, prioritize and cap. A limit above the eligible count is not an
/// error; fewer concepts are returned.
pub fn select_concepts(
    items: Vec<ConceptWithCard>,
    mode: QuizMode,
    concept_limit: usize,
    now: DateTime<Utc>,
) -> Vec<ConceptWithCard> {
    let mut eligible = filter_by_mode(items, mode, now);
    prioritize(&mut eligible);
    eligible.truncate(concept_limit);
    eligible
}
