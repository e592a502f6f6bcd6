//! Card lifecycle: creation and validated review application.
//!
//! Storage code never calls a [`SchedulingPolicy`] directly. It goes through
//! [`CardLifecycle`], which owns the policy and rejects any transition that
//! would break the card invariants before it reaches the database.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Card, CardState, Rating, ReviewLog};
use crate::scheduling::{FsrsScheduler, SchedulingPolicy};
use crate::uuid_utils::new_v7;

/// Creates cards and applies reviews through a scheduling policy.
#[derive(Clone)]
pub struct CardLifecycle {
    policy: Arc<dyn SchedulingPolicy>,
}

impl Default for CardLifecycle {
    fn default() -> Self {
        Self::new(Arc::new(FsrsScheduler::default()))
    }
}

impl std::fmt::Debug for CardLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardLifecycle").finish_non_exhaustive()
    }
}

impl CardLifecycle {
    pub fn new(policy: Arc<dyn SchedulingPolicy>) -> Self {
        Self { policy }
    }

    /// A fresh card for a newly synthesized concept: New, due immediately.
    pub fn create(&self, concept_id: Uuid, now: DateTime<Utc>) -> Card {
        Card {
            id: new_v7(),
            concept_id,
            state: CardState::New,
            step: Some(0),
            stability: None,
            difficulty: None,
            due: now,
            last_review: None,
        }
    }

    /// Apply a review and check the resulting card before returning it.
    pub fn review(
        &self,
        card: &Card,
        rating: Rating,
        now: DateTime<Utc>,
        review_duration_ms: Option<i64>,
    ) -> Result<(Card, ReviewLog)> {
        let (next, log) = self.policy.review(card, rating, now, review_duration_ms);
        check_transition(card, &next, &log, now)?;
        tracing::debug!(
            subsystem = "scheduling",
            card_id = %card.id,
            rating = rating.value(),
            card_state = %next.state,
            due = %next.due,
            "Applied review"
        );
        Ok((next, log))
    }

    pub fn retrievability(&self, card: &Card, now: DateTime<Utc>) -> Option<f64> {
        self.policy.retrievability(card, now)
    }
}

fn check_transition(before: &Card, after: &Card, log: &ReviewLog, now: DateTime<Utc>) -> Result<()> {
    let violation = if after.id != before.id || after.concept_id != before.concept_id {
        Some("card identity changed")
    } else if after.state == CardState::New {
        Some("reviewed card left in New")
    } else if after.last_review != Some(now) {
        Some("last_review not set to review time")
    } else if (after.state == CardState::Review) != after.step.is_none() {
        Some("step must be unset exactly in Review")
    } else if after.state == CardState::Review
        && (after.stability.is_none() || after.difficulty.is_none())
    {
        Some("Review card without memory state")
    } else if after.stability.is_some() != after.difficulty.is_some() {
        Some("stability and difficulty must be set together")
    } else if after.state == CardState::Learning && after.stability.is_some() {
        Some("memory state set before graduation")
    } else if after.stability.is_some_and(|s| s < 0.0) {
        Some("negative stability")
    } else if after.due < now {
        Some("due before review time")
    } else if log.card_id != before.id || log.review_datetime != now {
        Some("review log does not match card")
    } else {
        None
    };

    match violation {
        Some(msg) => Err(Error::Internal(format!(
            "scheduling policy produced invalid card {}: {}",
            before.id, msg
        ))),
        None => Ok(()),
    }
}
