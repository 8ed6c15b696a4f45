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
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ErrorReport;
use crate::error::fail;
use crate::types::note::NoteId;
use crate::types::timestamp::Timestamp;

/// Unique identifier of a card (UUID v4).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CardId(String);

impl CardId {
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

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for CardId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for CardId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Ok(CardId(string))
    }
}

impl Serialize for CardId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Which way a card drills its note: prompt with the front, or with the
/// back. At most one card per direction exists for a note, and reverse
/// cards are only created for bidirectional decks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            _ => fail(format!("invalid card direction: {value}")),
        }
    }
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Direction::try_from(string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// The scheduling state of a card. This is a closed set: unknown states in
/// the database are a load error, not a value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CardState {
    New,
    Learning,
    Review,
    Suspended,
}

impl CardState {
    pub fn as_str(self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Suspended => "suspended",
        }
    }
}

impl TryFrom<String> for CardState {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "new" => Ok(CardState::New),
            "learning" => Ok(CardState::Learning),
            "review" => Ok(CardState::Review),
            "suspended" => Ok(CardState::Suspended),
            _ => fail(format!("invalid card state: {value}")),
        }
    }
}

impl ToSql for CardState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CardState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        CardState::try_from(string).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for CardState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A card's scheduling fields.
#[derive(Clone, Debug)]
pub struct Card {
    pub card_id: CardId,
    pub note_id: NoteId,
    pub direction: Direction,
    pub state: CardState,
    pub due: Timestamp,
    /// The last review interval, in days. Zero until first graduation.
    pub interval_days: f64,
    pub ease: f64,
    pub lapses: u32,
    /// Position within the deck's learning steps.
    pub step_index: usize,
    pub last_review: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for state in [
            CardState::New,
            CardState::Learning,
            CardState::Review,
            CardState::Suspended,
        ] {
            assert_eq!(
                CardState::try_from(state.as_str().to_string()).unwrap(),
                state
            );
        }
        assert!(CardState::try_from("limbo".to_string()).is_err());
    }

    #[test]
    fn test_direction_round_trip() {
        for direction in [Direction::Forward, Direction::Reverse] {
            assert_eq!(
                Direction::try_from(direction.as_str().to_string()).unwrap(),
                direction
            );
        }
        assert!(Direction::try_from("sideways".to_string()).is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CardId::generate(), CardId::generate());
    }
}
