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
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::deck::DeckId;
use crate::types::timestamp::Timestamp;

/// Unique identifier of a note (UUID v4).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct NoteId(String);

impl NoteId {
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

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for NoteId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for NoteId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        Ok(NoteId(string))
    }
}

impl Serialize for NoteId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// A piece of content to learn. The metadata payload is an open key/value
/// object (grammatical class, example sentences, and so on) that the
/// scheduler stores but never interprets.
#[derive(Clone, Debug)]
pub struct Note {
    pub note_id: NoteId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub meta: Option<Value>,
    pub created_at: Timestamp,
}

/// Metadata must be a JSON object; its keys and values are unconstrained.
pub fn validate_meta(meta: &Value) -> Fallible<()> {
    if meta.is_object() {
        Ok(())
    } else {
        fail("note metadata must be a JSON object")
    }
}
