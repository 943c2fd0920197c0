use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::models::StudyItem;

const MIN_EASINESS_FACTOR: f64 = 1.3;

/// Scheduling state produced by one review event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub interval: i64,
    pub repetitions: i32,
    pub easiness_factor: f64,
    pub next_review: DateTime<Utc>,
}

/// SM-2 spaced-repetition scheduler.
///
/// `review` is a pure function of the item's `(interval, repetitions,
/// easiness_factor)` and the quality rating; no hidden state.
#[derive(Debug, Clone, Default)]
pub struct Sm2Scheduler;

impl Sm2Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// Compute the next review schedule from a quality rating in 1..=5.
    ///
    /// Quality >= 3 is a successful recall: the interval progresses
    /// 1 -> 6 -> round(interval * ef). Quality < 3 resets repetitions to 0
    /// and the interval to 1. The easiness factor is adjusted for every
    /// rating and never drops below 1.3.
    pub fn review(&self, item: &StudyItem, quality: u8, now: DateTime<Utc>) -> Result<ReviewOutcome> {
        if !(1..=5).contains(&quality) {
            return Err(anyhow::anyhow!("Invalid quality rating: {} (expected 1-5)", quality));
        }

        let (interval, repetitions) = if quality >= 3 {
            let interval = match item.repetitions {
                0 => 1,
                1 => 6,
                _ => (item.interval as f64 * item.easiness_factor).round() as i64,
            };
            (interval, item.repetitions + 1)
        } else {
            (1, 0)
        };

        let q = quality as f64;
        let easiness_factor =
            (item.easiness_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)))
                .max(MIN_EASINESS_FACTOR);

        Ok(ReviewOutcome {
            interval,
            repetitions,
            easiness_factor,
            next_review: now + Duration::days(interval),
        })
    }

    /// Apply a review outcome to the item in place.
    pub fn apply_review(&self, item: &mut StudyItem, quality: u8, now: DateTime<Utc>) -> Result<()> {
        let outcome = self.review(item, quality, now)?;
        item.interval = outcome.interval;
        item.repetitions = outcome.repetitions;
        item.easiness_factor = outcome.easiness_factor;
        item.next_review = outcome.next_review;
        item.last_reviewed = Some(now);
        Ok(())
    }
}
