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

use std::fmt::Display;
use std::fmt::Formatter;

use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_NEW_PER_DAY: u32 = 10;

/// The review limit is re-derived as this multiple of the new-card limit
/// whenever the latter changes without an explicit override.
pub const REV_PER_NEW_RATIO: u32 = 10;

/// Default learning steps: ten minutes, then a day.
pub const DEFAULT_STEPS_MIN: [u32; 2] = [10, 1440];

/// Unique identifier of a deck (UUID v4).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DeckId(String);

impl DeckId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeckId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for DeckId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for DeckId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Ok(DeckId(string))
    }
}

impl Serialize for DeckId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Per-deck scheduling preferences, stored as JSON in the decks table.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DeckPrefs {
    pub new_per_day: u32,
    pub rev_per_day: u32,
    /// Learning step durations, in minutes.
    pub steps_min: Vec<u32>,
    /// Whether adding a note also creates a reverse card.
    #[serde(default)]
    pub bidirectional: bool,
}

impl Default for DeckPrefs {
    fn default() -> Self {
        Self {
            new_per_day: DEFAULT_NEW_PER_DAY,
            rev_per_day: DEFAULT_NEW_PER_DAY * REV_PER_NEW_RATIO,
            steps_min: DEFAULT_STEPS_MIN.to_vec(),
            bidirectional: false,
        }
    }
}

impl DeckPrefs {
    /// Clamp invalid values to safe defaults. An empty learning-step list
    /// would leave cards with nowhere to go.
    pub fn normalized(mut self) -> Self {
        if self.steps_min.is_empty() {
            self.steps_min = DEFAULT_STEPS_MIN.to_vec();
        }
        self
    }
}

/// A preferences update. Unset fields keep their current values.
#[derive(Clone, Default, Debug, Deserialize)]
pub struct PartialPrefs {
    pub new_per_day: Option<u32>,
    pub rev_per_day: Option<u32>,
    pub steps_min: Option<Vec<u32>>,
    pub bidirectional: Option<bool>,
}

impl PartialPrefs {
    /// Merge into existing preferences. Changing `new_per_day` re-derives
    /// `rev_per_day` unless the same update overrides it explicitly.
    pub fn apply(self, mut prefs: DeckPrefs) -> DeckPrefs {
        if let Some(new_per_day) = self.new_per_day {
            prefs.new_per_day = new_per_day;
            prefs.rev_per_day = new_per_day.saturating_mul(REV_PER_NEW_RATIO);
        }
        if let Some(rev_per_day) = self.rev_per_day {
            prefs.rev_per_day = rev_per_day;
        }
        if let Some(steps_min) = self.steps_min {
            prefs.steps_min = steps_min;
        }
        if let Some(bidirectional) = self.bidirectional {
            prefs.bidirectional = bidirectional;
        }
        prefs.normalized()
    }
}

/// A collection of notes studied together under one set of preferences.
#[derive(Clone, Debug)]
pub struct Deck {
    pub deck_id: DeckId,
    pub name: String,
    pub is_builtin: bool,
    pub prefs: DeckPrefs,
}
