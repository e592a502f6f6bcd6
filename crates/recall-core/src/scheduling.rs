//! Spaced-repetition scheduling.
//!
//! [`SchedulingPolicy`] is the seam between card bookkeeping and the memory
//! model. [`FsrsScheduler`] implements FSRS-5 with short learning and
//! relearning step ladders ahead of stability-based Review intervals.
//!
//! A card in [`CardState::New`] is scheduled exactly like a Learning card at
//! step 0; the first review always moves it out of New. Stability and
//! difficulty stay unset while a card walks the learning ladder and are first
//! computed from the rating that graduates it into Review.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::defaults;
use crate::models::{Card, CardState, Rating, ReviewLog};
use crate::uuid_utils::new_v7;

/// Decides the next state of a card after a review.
///
/// Implementations are pure with respect to storage: they receive the card
/// as read and return the card to persist plus the log entry to append.
pub trait SchedulingPolicy: Send + Sync {
    /// Apply `rating` to `card` at `now`.
    fn review(
        &self,
        card: &Card,
        rating: Rating,
        now: DateTime<Utc>,
        review_duration_ms: Option<i64>,
    ) -> (Card, ReviewLog);

    /// Probability of recall at `now`, if the card has memory state.
    fn retrievability(&self, card: &Card, now: DateTime<Utc>) -> Option<f64>;
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunable scheduler parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub learning_steps: Vec<Duration>,
    pub relearning_steps: Vec<Duration>,
    /// Cap on Review intervals, in days. Values above
    /// [`defaults::MAX_SCHEDULE_DAYS`] are treated as that limit.
    pub maximum_interval_days: i64,
    pub desired_retention: f64,
    pub enable_fuzzing: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: vec![
                Duration::minutes(1),
                Duration::minutes(10),
                Duration::minutes(30),
                Duration::days(1),
            ],
            relearning_steps: vec![
                Duration::minutes(1),
                Duration::minutes(10),
                Duration::minutes(30),
                Duration::hours(1),
                Duration::days(1),
            ],
            maximum_interval_days: defaults::MAX_INTERVAL_DAYS,
            desired_retention: defaults::DESIRED_RETENTION,
            enable_fuzzing: defaults::ENABLE_FUZZ,
        }
    }
}

// =============================================================================
// FSRS
// =============================================================================

/// FSRS-5 default model weights.
pub const FSRS_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;
const MIN_STABILITY: f64 = 0.01;
const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;

/// Fuzz bands: (lower bound in days, upper bound in days, spread factor).
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.1),
    (20.0, f64::INFINITY, 0.05),
];

/// FSRS-5 scheduler with learning and relearning ladders.
#[derive(Debug, Clone)]
pub struct FsrsScheduler {
    config: SchedulerConfig,
    w: [f64; 19],
}

impl Default for FsrsScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl FsrsScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            w: FSRS_WEIGHTS,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn initial_stability(&self, rating: Rating) -> f64 {
        self.w[rating.value() as usize - 1].max(MIN_STABILITY)
    }

    fn raw_initial_difficulty(&self, rating: Rating) -> f64 {
        self.w[4] - (self.w[5] * (f64::from(rating.value()) - 1.0)).exp() + 1.0
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        self.raw_initial_difficulty(rating)
            .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    /// Whole days in the interval that brings recall down to the target
    /// retention, clamped to `1..=maximum_interval_days`.
    fn max_interval_days(&self) -> i64 {
        self.config
            .maximum_interval_days
            .clamp(1, defaults::MAX_SCHEDULE_DAYS)
    }

    fn next_interval_days(&self, stability: f64) -> i64 {
        let ivl = (stability / FACTOR)
            * (self.config.desired_retention.powf(1.0 / DECAY) - 1.0);
        (ivl.round() as i64).clamp(1, self.max_interval_days())
    }

    fn short_term_stability(&self, stability: f64, rating: Rating) -> f64 {
        let r = f64::from(rating.value());
        (stability * (self.w[17] * (r - 3.0 + self.w[18])).exp()).max(MIN_STABILITY)
    }

    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let r = f64::from(rating.value());
        let delta = -(self.w[6] * (r - 3.0));
        let damped = difficulty + (10.0 - difficulty) * delta / 9.0;
        let reverted =
            self.w[7] * self.raw_initial_difficulty(Rating::Easy) + (1.0 - self.w[7]) * damped;
        reverted.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    fn recall_stability(&self, d: f64, s: f64, r: f64, rating: Rating) -> f64 {
        let hard_penalty = if rating == Rating::Hard { self.w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { self.w[16] } else { 1.0 };
        s * (1.0
            + self.w[8].exp()
                * (11.0 - d)
                * s.powf(-self.w[9])
                * (((1.0 - r) * self.w[10]).exp() - 1.0)
                * hard_penalty
                * easy_bonus)
    }

    fn forget_stability(&self, d: f64, s: f64, r: f64) -> f64 {
        let long_term = self.w[11]
            * d.powf(-self.w[12])
            * ((s + 1.0).powf(self.w[13]) - 1.0)
            * ((1.0 - r) * self.w[14]).exp();
        let short_term = s / (self.w[17] * self.w[18]).exp();
        long_term.min(short_term)
    }

    fn next_stability(&self, d: f64, s: f64, r: f64, rating: Rating) -> f64 {
        let next = if rating == Rating::Again {
            self.forget_stability(d, s, r)
        } else {
            self.recall_stability(d, s, r, rating)
        };
        next.max(MIN_STABILITY)
    }

    fn retrievability_at(&self, stability: f64, elapsed_days: i64) -> f64 {
        let elapsed = elapsed_days.max(0) as f64;
        (1.0 + FACTOR * elapsed / stability).powf(DECAY)
    }

    /// Update stability and difficulty for a card with a prior review.
    fn update_memory(
        &self,
        stability: f64,
        difficulty: f64,
        elapsed_days: Option<i64>,
        rating: Rating,
    ) -> (f64, f64) {
        let s = match elapsed_days {
            Some(days) if days >= 1 => {
                let r = self.retrievability_at(stability, days);
                self.next_stability(difficulty, stability, r, rating)
            }
            _ => self.short_term_stability(stability, rating),
        };
        (s, self.next_difficulty(difficulty, rating))
    }

    /// Interval for a Hard rating while on a ladder.
    fn hard_step(steps: &[Duration], step: usize) -> Duration {
        match (step, steps.len()) {
            (0, 1) => scale(steps[0], 1.5),
            (0, _) => (steps[0] + steps[1]) / 2,
            (i, _) => steps[i],
        }
    }

    /// Walk a step ladder. Returns the next state, step, and interval, or
    /// `None` when the card graduates to Review.
    fn ladder(
        steps: &[Duration],
        step: usize,
        rating: Rating,
        ladder_state: CardState,
    ) -> Option<(CardState, Option<i32>, Duration)> {
        if steps.is_empty() || (step >= steps.len() && rating != Rating::Again) {
            return None;
        }
        match rating {
            Rating::Again => Some((ladder_state, Some(0), steps[0])),
            Rating::Hard => Some((ladder_state, Some(step as i32), Self::hard_step(steps, step))),
            Rating::Good if step + 1 >= steps.len() => None,
            Rating::Good => Some((ladder_state, Some(step as i32 + 1), steps[step + 1])),
            Rating::Easy => None,
        }
    }

    /// Spread a Review interval so reviews of equal cards do not pile up.
    fn fuzz_interval(&self, interval_days: i64) -> i64 {
        let ivl = interval_days as f64;
        if ivl < 2.5 {
            return interval_days;
        }
        let delta = 1.0
            + FUZZ_RANGES
                .iter()
                .map(|&(start, end, factor)| factor * (ivl.min(end) - start).max(0.0))
                .sum::<f64>();
        let max_days = self.max_interval_days();
        let min_ivl = ((ivl - delta).round() as i64).max(2);
        let max_ivl = ((ivl + delta).round() as i64).min(max_days);
        let min_ivl = min_ivl.min(max_ivl);
        let fuzzed = rand::thread_rng().gen::<f64>() * (max_ivl - min_ivl + 1) as f64
            + min_ivl as f64;
        (fuzzed.round() as i64).min(max_days)
    }
}

fn scale(d: Duration, factor: f64) -> Duration {
    Duration::milliseconds((d.num_milliseconds() as f64 * factor).round() as i64)
}

impl SchedulingPolicy for FsrsScheduler {
    fn review(
        &self,
        card: &Card,
        rating: Rating,
        now: DateTime<Utc>,
        review_duration_ms: Option<i64>,
    ) -> (Card, ReviewLog) {
        let elapsed_days = card.last_review.map(|last| (now - last).num_days());

        let step = card.step.unwrap_or(0).max(0) as usize;
        let on_ladder = match card.state {
            CardState::New | CardState::Learning => Self::ladder(
                &self.config.learning_steps,
                step,
                rating,
                CardState::Learning,
            ),
            CardState::Relearning => Self::ladder(
                &self.config.relearning_steps,
                step,
                rating,
                CardState::Relearning,
            ),
            CardState::Review => match (rating, self.config.relearning_steps.first()) {
                (Rating::Again, Some(first)) => Some((CardState::Relearning, Some(0), *first)),
                _ => None,
            },
        };

        let prior = card.stability.zip(card.difficulty);
        let (state, step, interval, memory) = match on_ladder {
            Some((state, step, interval)) => {
                let memory = match state {
                    CardState::Learning => None,
                    _ => prior.map(|(s, d)| self.update_memory(s, d, elapsed_days, rating)),
                };
                (state, step, interval, memory)
            }
            None => {
                let (stability, difficulty) = match prior {
                    Some((s, d)) => self.update_memory(s, d, elapsed_days, rating),
                    None => (
                        self.initial_stability(rating),
                        self.initial_difficulty(rating),
                    ),
                };
                let mut days = self.next_interval_days(stability);
                if self.config.enable_fuzzing {
                    days = self.fuzz_interval(days);
                }
                (
                    CardState::Review,
                    None,
                    Duration::days(days),
                    Some((stability, difficulty)),
                )
            }
        };

        let next = Card {
            id: card.id,
            concept_id: card.concept_id,
            state,
            step,
            stability: memory.map(|(s, _)| s),
            difficulty: memory.map(|(_, d)| d),
            due: now + interval,
            last_review: Some(now),
        };
        let log = ReviewLog {
            id: new_v7(),
            card_id: card.id,
            rating,
            review_datetime: now,
            review_duration_ms,
        };
        (next, log)
    }

    fn retrievability(&self, card: &Card, now: DateTime<Utc>) -> Option<f64> {
        let stability = card.stability?;
        let last = card.last_review?;
        Some(self.retrievability_at(stability, (now - last).num_days()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn no_fuzz() -> FsrsScheduler {
        FsrsScheduler::new(SchedulerConfig {
            enable_fuzzing: false,
            ..SchedulerConfig::default()
        })
    }

    fn new_card(now: DateTime<Utc>) -> Card {
        Card {
            id: Uuid::new_v4(),
            concept_id: Uuid::new_v4(),
            state: CardState::New,
            step: Some(0),
            stability: None,
            difficulty: None,
            due: now,
            last_review: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-05T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_first_review_leaves_new() {
        let s = no_fuzz();
        let now = t0();
        for rating in Rating::ALL {
            let (card, log) = s.review(&new_card(now), rating, now, None);
            assert_ne!(card.state, CardState::New);
            assert_eq!(card.last_review, Some(now));
            assert_eq!(log.rating, rating);
            assert_eq!(log.review_datetime, now);
            let graduated = card.state == CardState::Review;
            assert_eq!(card.stability.is_some(), graduated, "{:?}", rating);
            assert_eq!(card.difficulty.is_some(), graduated, "{:?}", rating);
        }
    }

    #[test]
    fn test_initial_memory_state_matches_weights() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Learning;
        card.step = Some(3);
        card.last_review = Some(now - Duration::days(1));
        let (card, _) = s.review(&card, Rating::Good, now, None);
        assert_eq!(card.state, CardState::Review);
        assert!((card.stability.unwrap() - 3.173).abs() < 1e-9);
        let expected_d = 7.1949 - (0.5345f64 * 2.0).exp() + 1.0;
        assert!((card.difficulty.unwrap() - expected_d).abs() < 1e-9);
    }

    #[test]
    fn test_learning_card_has_no_memory_state() {
        let s = no_fuzz();
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Good, now, None);
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step, Some(1));
        assert_eq!(card.stability, None);
        assert_eq!(card.difficulty, None);
    }

    #[test]
    fn test_huge_maximum_interval_is_limited() {
        let s = FsrsScheduler::new(SchedulerConfig {
            maximum_interval_days: i64::MAX,
            enable_fuzzing: false,
            ..SchedulerConfig::default()
        });
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Review;
        card.step = None;
        card.stability = Some(1e12);
        card.difficulty = Some(1.0);
        card.last_review = Some(now - Duration::days(30));
        let (next, _) = s.review(&card, Rating::Easy, now, None);
        assert_eq!(next.due, now + Duration::days(defaults::MAX_SCHEDULE_DAYS));
    }

    #[test]
    fn test_good_walks_learning_ladder() {
        let s = no_fuzz();
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Good, now, None);
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step, Some(1));
        assert_eq!(card.due, now + Duration::minutes(10));
    }

    #[test]
    fn test_again_resets_to_first_step() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Learning;
        card.step = Some(2);
        card.last_review = Some(now - Duration::minutes(10));
        let (next, _) = s.review(&card, Rating::Again, now, None);
        assert_eq!(next.state, CardState::Learning);
        assert_eq!(next.step, Some(0));
        assert_eq!(next.due, now + Duration::minutes(1));
    }

    #[test]
    fn test_hard_at_step_zero_averages_first_two_steps() {
        let s = no_fuzz();
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Hard, now, None);
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step, Some(0));
        assert_eq!(card.due, now + Duration::seconds(330));
    }

    #[test]
    fn test_hard_single_step_ladder_scales_step() {
        let s = FsrsScheduler::new(SchedulerConfig {
            learning_steps: vec![Duration::minutes(10)],
            enable_fuzzing: false,
            ..SchedulerConfig::default()
        });
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Hard, now, None);
        assert_eq!(card.due, now + Duration::minutes(15));
    }

    #[test]
    fn test_easy_on_new_card_graduates() {
        let s = no_fuzz();
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Easy, now, None);
        assert_eq!(card.state, CardState::Review);
        assert_eq!(card.step, None);
        assert!(card.due >= now + Duration::days(1));
        assert!(card.due <= now + Duration::days(14));
    }

    #[test]
    fn test_good_on_last_step_graduates() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Learning;
        card.step = Some(3);
        card.last_review = Some(now - Duration::days(1));
        let (next, _) = s.review(&card, Rating::Good, now, None);
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.step, None);
        assert!(next.stability.is_some());
        assert!(next.difficulty.is_some());
    }

    #[test]
    fn test_empty_learning_ladder_graduates_immediately() {
        let s = FsrsScheduler::new(SchedulerConfig {
            learning_steps: vec![],
            enable_fuzzing: false,
            ..SchedulerConfig::default()
        });
        let now = t0();
        let (card, _) = s.review(&new_card(now), Rating::Again, now, None);
        assert_eq!(card.state, CardState::Review);
    }

    #[test]
    fn test_review_lapse_enters_relearning() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Review;
        card.step = None;
        card.stability = Some(10.0);
        card.difficulty = Some(5.0);
        card.last_review = Some(now - Duration::days(10));
        let (next, _) = s.review(&card, Rating::Again, now, None);
        assert_eq!(next.state, CardState::Relearning);
        assert_eq!(next.step, Some(0));
        assert_eq!(next.due, now + Duration::minutes(1));
        assert!(next.stability.unwrap() < 10.0);
    }

    #[test]
    fn test_review_lapse_without_relearning_ladder_stays_in_review() {
        let s = FsrsScheduler::new(SchedulerConfig {
            relearning_steps: vec![],
            enable_fuzzing: false,
            ..SchedulerConfig::default()
        });
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Review;
        card.step = None;
        card.stability = Some(10.0);
        card.difficulty = Some(5.0);
        card.last_review = Some(now - Duration::days(10));
        let (next, _) = s.review(&card, Rating::Again, now, None);
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.step, None);
    }

    #[test]
    fn test_review_success_grows_stability() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Review;
        card.step = None;
        card.stability = Some(5.0);
        card.difficulty = Some(5.0);
        card.last_review = Some(now - Duration::days(5));
        let (next, _) = s.review(&card, Rating::Good, now, None);
        assert_eq!(next.state, CardState::Review);
        assert!(next.stability.unwrap() > 5.0);
    }

    #[test]
    fn test_interval_never_exceeds_maximum() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        card.state = CardState::Review;
        card.step = None;
        card.stability = Some(400.0);
        card.difficulty = Some(1.0);
        card.last_review = Some(now - Duration::days(14));
        let (next, _) = s.review(&card, Rating::Easy, now, None);
        assert_eq!(next.due, now + Duration::days(14));
    }

    #[test]
    fn test_fuzz_stays_within_bounds() {
        let s = FsrsScheduler::default();
        for ivl in [1, 2, 3, 7, 10, 14] {
            for _ in 0..50 {
                let fuzzed = s.fuzz_interval(ivl);
                if ivl < 3 {
                    assert_eq!(fuzzed, ivl);
                } else {
                    assert!(fuzzed >= 2, "fuzzed {} below floor", fuzzed);
                    assert!(fuzzed <= 14, "fuzzed {} above cap", fuzzed);
                    assert!((fuzzed - ivl).abs() <= 3);
                }
            }
        }
    }

    #[test]
    fn test_difficulty_stays_in_range() {
        let s = no_fuzz();
        for d in [1.0, 5.0, 10.0] {
            for rating in Rating::ALL {
                let next = s.next_difficulty(d, rating);
                assert!((1.0..=10.0).contains(&next));
            }
        }
    }

    #[test]
    fn test_retrievability_decays_with_time() {
        let s = no_fuzz();
        let now = t0();
        let mut card = new_card(now);
        assert!(s.retrievability(&card, now).is_none());
        card.stability = Some(5.0);
        card.last_review = Some(now);
        let fresh = s.retrievability(&card, now).unwrap();
        let later = s.retrievability(&card, now + Duration::days(10)).unwrap();
        assert!((fresh - 1.0).abs() < 1e-9);
        assert!(later < fresh);
    }

    #[test]
    fn test_review_is_deterministic_without_fuzz() {
        let s = no_fuzz();
        let now = t0();
        let card = new_card(now);
        let (a, _) = s.review(&card, Rating::Easy, now, Some(1200));
        let (b, _) = s.review(&card, Rating::Easy, now, Some(1200));
        assert_eq!(a, b);
    }
}
