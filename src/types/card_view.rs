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

use serde::Serialize;
use serde_json::Value;

use crate::types::card::CardId;
use crate::types::card::CardState;
use crate::types::card::Direction;
use crate::types::deck::DeckId;
use crate::types::note::NoteId;
use crate::types::timestamp::Timestamp;

/// A card joined with its note and deck, as presented in a session queue.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub card_id: CardId,
    pub note_id: NoteId,
    pub deck_id: DeckId,
    pub deck_name: String,
    pub direction: Direction,
    pub front: String,
    pub back: String,
    pub meta: Option<Value>,
    pub state: CardState,
    pub due: Timestamp,
    pub interval_days: f64,
    pub ease: f64,
    pub lapses: u32,
    pub step_index: usize,
}

impl CardView {
    /// The text shown when the card is presented: reverse cards prompt
    /// with the note's back.
    pub fn prompt(&self) -> &str {
        match self.direction {
            Direction::Forward => &self.front,
            Direction::Reverse => &self.back,
        }
    }

    pub fn answer(&self) -> &str {
        match self.direction {
            Direction::Forward => &self.back,
            Direction::Reverse => &self.front,
        }
    }
}
