// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use rand::Rng;

use crate::types::card::Card;
use crate::types::card::CardState;
use crate::types::rating::Rating;
use crate::types::timestamp::SECS_PER_DAY;
use crate::types::timestamp::Timestamp;

/// The floor below which ease never drops.
pub const MIN_EASE: f64 = 1.3;

/// Ease assigned to cards that have never been reviewed.
pub const DEFAULT_EASE: f64 = 2.5;

/// Interval granted when graduating with `Good`, in days.
const GRADUATING_INTERVAL_GOOD: f64 = 1.0;

/// Interval granted when graduating with `Easy`, in days.
const GRADUATING_INTERVAL_EASY: f64 = 4.0;

/// Minimum delay when repeating a learning step with `Hard`, in minutes.
const HARD_STEP_FLOOR_MIN: u32 = 10;

/// The maximum review interval, in days.
const MAX_INTERVAL: f64 = 36_500.0;

const LAPSE_EASE_PENALTY: f64 = 0.2;
const LAPSE_INTERVAL_FACTOR: f64 = 0.5;
const HARD_EASE_PENALTY: f64 = 0.15;
const HARD_INTERVAL_FACTOR: f64 = 1.2;
const EASY_EASE_BONUS: f64 = 0.15;
const EASY_INTERVAL_BONUS: f64 = 1.3;

/// The card fields recomputed by grading a review.
#[derive(Clone, PartialEq, Debug)]
pub struct Transition {
    pub state: CardState,
    pub due: Timestamp,
    pub interval_days: f64,
    pub ease: f64,
    pub lapses: u32,
    pub step_index: usize,
}

/// Compute a card's next scheduling state from `(state, rating, now)`.
///
/// Returns `None` for suspended cards: the rating is accepted but changes
/// nothing. `steps` holds the deck's learning steps in minutes and must be
/// non-empty (deck preferences are normalized before reaching this point).
pub fn transition<R: Rng>(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    steps: &[u32],
    rng: &mut R,
) -> Option<Transition> {
    match card.state {
        CardState::New => Some(rate_new(card, rating, now, steps, rng)),
        CardState::Learning => Some(rate_learning(card, rating, now, steps, rng)),
        CardState::Review => Some(rate_review(card, rating, now, steps, rng)),
        CardState::Suspended => None,
    }
}

fn rate_new<R: Rng>(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    steps: &[u32],
    rng: &mut R,
) -> Transition {
    match rating {
        Rating::Easy => graduate(card, GRADUATING_INTERVAL_EASY, now, rng),
        Rating::Again | Rating::Hard | Rating::Good => Transition {
            state: CardState::Learning,
            due: now.add_minutes(step_minutes(steps, 0)),
            interval_days: 0.0,
            ease: card.ease,
            lapses: card.lapses,
            step_index: 0,
        },
    }
}

fn rate_learning<R: Rng>(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    steps: &[u32],
    rng: &mut R,
) -> Transition {
    match rating {
        Rating::Again => {
            // A non-zero interval means the card lapsed out of review, so
            // failing a step again counts as another lapse.
            let lapses = if card.interval_days > 0.0 {
                card.lapses + 1
            } else {
                card.lapses
            };
            Transition {
                state: CardState::Learning,
                due: now.add_minutes(step_minutes(steps, 0)),
                interval_days: card.interval_days,
                ease: card.ease,
                lapses,
                step_index: 0,
            }
        }
        Rating::Hard => {
            let minutes = step_minutes(steps, card.step_index).max(HARD_STEP_FLOOR_MIN);
            Transition {
                state: CardState::Learning,
                due: now.add_minutes(minutes),
                interval_days: card.interval_days,
                ease: card.ease,
                lapses: card.lapses,
                step_index: card.step_index,
            }
        }
        Rating::Good => {
            if card.step_index + 1 >= steps.len() {
                graduate(card, GRADUATING_INTERVAL_GOOD, now, rng)
            } else {
                let next = card.step_index + 1;
                Transition {
                    state: CardState::Learning,
                    due: now.add_minutes(step_minutes(steps, next)),
                    interval_days: card.interval_days,
                    ease: card.ease,
                    lapses: card.lapses,
                    step_index: next,
                }
            }
        }
        Rating::Easy => graduate(card, GRADUATING_INTERVAL_EASY, now, rng),
    }
}

fn rate_review<R: Rng>(
    card: &Card,
    rating: Rating,
    now: Timestamp,
    steps: &[u32],
    rng: &mut R,
) -> Transition {
    let days_late = f64::max(0.0, now.secs_since(card.due) as f64 / SECS_PER_DAY as f64);
    match rating {
        Rating::Again => Transition {
            state: CardState::Learning,
            due: now.add_minutes(step_minutes(steps, 0)),
            interval_days: f64::max(1.0, card.interval_days * LAPSE_INTERVAL_FACTOR),
            ease: f64::max(MIN_EASE, card.ease - LAPSE_EASE_PENALTY),
            lapses: card.lapses + 1,
            step_index: 0,
        },
        Rating::Hard => reschedule(
            card,
            f64::max(1.0, card.interval_days * HARD_INTERVAL_FACTOR),
            f64::max(MIN_EASE, card.ease - HARD_EASE_PENALTY),
            now,
            rng,
        ),
        Rating::Good => reschedule(
            card,
            (card.interval_days + days_late / 2.0) * card.ease,
            card.ease,
            now,
            rng,
        ),
        Rating::Easy => reschedule(
            card,
            (card.interval_days + days_late) * card.ease * EASY_INTERVAL_BONUS,
            card.ease + EASY_EASE_BONUS,
            now,
            rng,
        ),
    }
}

/// Leave the learning steps and enter the review state.
fn graduate<R: Rng>(card: &Card, base_days: f64, now: Timestamp, rng: &mut R) -> Transition {
    let interval = fuzzed(base_days, rng);
    Transition {
        state: CardState::Review,
        due: now.add_days(interval),
        interval_days: interval,
        ease: card.ease,
        lapses: card.lapses,
        step_index: 0,
    }
}

fn reschedule<R: Rng>(
    card: &Card,
    interval: f64,
    ease: f64,
    now: Timestamp,
    rng: &mut R,
) -> Transition {
    let interval = fuzzed(interval, rng).min(MAX_INTERVAL);
    Transition {
        state: CardState::Review,
        due: now.add_days(interval),
        interval_days: interval,
        ease,
        lapses: card.lapses,
        step_index: card.step_index,
    }
}

/// Multiply by a random factor in [0.95, 1.05] so siblings added together
/// drift apart. Sub-day intervals are left exact.
fn fuzzed<R: Rng>(days: f64, rng: &mut R) -> f64 {
    if days < 1.0 {
        days
    } else {
        days * rng.gen_range(0.95..=1.05)
    }
}

/// A card's learning step in minutes. Out-of-range indices fall back to
/// the last step: preferences may have been shortened since the card was
/// last reviewed.
fn step_minutes(steps: &[u32], index: usize) -> u32 {
    match steps.get(index) {
        Some(minutes) => *minutes,
        None => steps.last().copied().unwrap_or(HARD_STEP_FLOOR_MIN),
    }
}
