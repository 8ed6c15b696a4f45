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

use crate::types::card::CardId;
use crate::types::card::CardState;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// One row of the append-only review log. A row is written for every
/// graded review, whether or not the grading changed the card.
#[derive(Clone, Debug)]
pub struct ReviewLogEntry {
    pub card_id: CardId,
    pub reviewed_at: Timestamp,
    pub rating: Rating,
    /// How long the user took to answer, in milliseconds.
    pub answer_ms: u32,
    pub prev_state: CardState,
    pub prev_interval: f64,
    pub next_interval: f64,
}
