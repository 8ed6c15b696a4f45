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

use std::collections::HashSet;
use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::types::card_view::CardView;
use crate::types::note::NoteId;

/// How far ahead of `now` a learning card may be pulled into a session,
/// in seconds.
pub const LEARN_AHEAD_SECS: i64 = 1800;

/// Maximum jitter added to learning-card ordering keys, in seconds.
const LEARNING_JITTER_SECS: i64 = 300;

/// A learning card is slotted in after this many non-learning cards.
const LEARNING_CADENCE: usize = 3;

/// New cards occupy roughly every fourth queue slot.
const NEW_CADENCE: usize = 4;

/// Due candidates partitioned by state. Learning cards are due within the
/// learn-ahead window, review cards are due now, and new cards have never
/// been studied.
pub struct Pools {
    pub learning: Vec<CardView>,
    pub review: Vec<CardView>,
    pub new: Vec<CardView>,
}

/// Assemble the presentation queue: cap the review and new pools to their
/// remaining daily quotas, bury siblings of queued learning cards, jitter
/// and shuffle, then interleave the three pools.
pub fn assemble<R: Rng>(
    pools: Pools,
    new_quota: usize,
    rev_quota: usize,
    rng: &mut R,
) -> Vec<CardView> {
    let Pools {
        learning,
        mut review,
        mut new,
    } = pools;
    review.truncate(rev_quota);
    new.truncate(new_quota);

    // Sibling burying: a note with a card queued for urgent presentation
    // suppresses its other cards. Learning cards themselves are never
    // buried.
    if !learning.is_empty() {
        let buried: HashSet<NoteId> = learning.iter().map(|c| c.note_id.clone()).collect();
        review.retain(|c| !buried.contains(&c.note_id));
        new.retain(|c| !buried.contains(&c.note_id));
    }

    let learning = jitter_sort(learning, rng);
    review.shuffle(rng);
    new.shuffle(rng);

    interleave(learning, review, new)
}

/// Order learning cards by due time plus up to five minutes of jitter, so
/// that cards which became due at the same moment do not always appear in
/// the same order.
fn jitter_sort<R: Rng>(learning: Vec<CardView>, rng: &mut R) -> Vec<CardView> {
    let mut keyed: Vec<(i64, CardView)> = learning
        .into_iter()
        .map(|card| (card.due.unix() + rng.gen_range(0..=LEARNING_JITTER_SECS), card))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, card)| card).collect()
}

/// Merge the pools into one queue. A learning card lands after every
/// `LEARNING_CADENCE` non-learning cards (or immediately when the other
/// pools are empty); new cards take roughly every `NEW_CADENCE`-th slot;
/// review cards fill the rest. Exhausted pools fall back to whatever
/// remains.
fn interleave(
    learning: Vec<CardView>,
    review: Vec<CardView>,
    new: Vec<CardView>,
) -> Vec<CardView> {
    let mut learning: VecDeque<CardView> = learning.into();
    let mut review: VecDeque<CardView> = review.into();
    let mut new: VecDeque<CardView> = new.into();
    let mut queue = Vec::with_capacity(learning.len() + review.len() + new.len());
    let mut since_learning = 0;
    loop {
        let others_empty = review.is_empty() && new.is_empty();
        if !learning.is_empty() && (since_learning >= LEARNING_CADENCE || others_empty) {
            if let Some(card) = learning.pop_front() {
                queue.push(card);
            }
            since_learning = 0;
            continue;
        }
        let prefer_new = queue.len() % NEW_CADENCE == 0;
        let next = if prefer_new {
            new.pop_front().or_else(|| review.pop_front())
        } else {
            review.pop_front().or_else(|| new.pop_front())
        };
        match next {
            Some(card) => {
                queue.push(card);
                since_learning += 1;
            }
            None => break,
        }
    }
    queue
}
