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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::error::Fallible;
use crate::sm2::Transition;
use crate::types::card::Card;
use crate::types::card::CardId;
use crate::types::card::CardState;
use crate::types::card_view::CardView;
use crate::types::deck::Deck;
use crate::types::deck::DeckId;
use crate::types::deck::DeckPrefs;
use crate::types::note::Note;
use crate::types::note::NoteId;
use crate::types::review::ReviewLogEntry;
use crate::types::study_date::StudyDate;
use crate::types::timestamp::Timestamp;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(database_path: &str) -> Fallible<Self> {
        let conn = Connection::open(database_path)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Fallible<Self> {
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !probe_schema_exists(&tx)? {
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self { conn })
    }

    /// Create a new deck.
    pub fn create_deck(&self, name: &str, is_builtin: bool, prefs: &DeckPrefs) -> Fallible<DeckId> {
        let deck_id = DeckId::generate();
        let prefs_json = serde_json::to_string(prefs)?;
        let conn = self.acquire();
        conn.execute(
            "insert into decks (deck_id, name, is_builtin, prefs) values (?, ?, ?, ?);",
            (&deck_id, name, is_builtin, prefs_json),
        )?;
        Ok(deck_id)
    }

    pub fn get_deck(&self, deck_id: &DeckId) -> Fallible<Option<Deck>> {
        let conn = self.acquire();
        let sql = "select deck_id, name, is_builtin, prefs from decks where deck_id = ?;";
        let mut stmt = conn.prepare(sql)?;
        let deck = stmt.query_row((deck_id,), deck_from_row).optional()?;
        Ok(deck)
    }

    pub fn find_deck_by_name(&self, name: &str) -> Fallible<Option<Deck>> {
        let conn = self.acquire();
        let sql = "select deck_id, name, is_builtin, prefs from decks where name = ?;";
        let mut stmt = conn.prepare(sql)?;
        let deck = stmt.query_row((name,), deck_from_row).optional()?;
        Ok(deck)
    }

    /// All decks, built-in decks first.
    pub fn list_decks(&self) -> Fallible<Vec<Deck>> {
        let conn = self.acquire();
        let sql = "select deck_id, name, is_builtin, prefs from decks order by is_builtin desc, name;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut decks = Vec::new();
        while let Some(row) = rows.next()? {
            decks.push(deck_from_row(row)?);
        }
        Ok(decks)
    }

    /// Returns false when no such deck exists.
    pub fn update_deck_prefs(&self, deck_id: &DeckId, prefs: &DeckPrefs) -> Fallible<bool> {
        let prefs_json = serde_json::to_string(prefs)?;
        let conn = self.acquire();
        let changed = conn.execute(
            "update decks set prefs = ? where deck_id = ?;",
            (prefs_json, deck_id),
        )?;
        Ok(changed > 0)
    }

    /// Insert a note and its cards in one transaction.
    pub fn insert_note(&self, note: &Note, cards: &[Card]) -> Fallible<()> {
        let meta_json = match &note.meta {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        tx.execute(
            "insert into notes (note_id, deck_id, front, back, meta, created_at) values (?, ?, ?, ?, ?, ?);",
            (
                &note.note_id,
                &note.deck_id,
                &note.front,
                &note.back,
                meta_json,
                note.created_at,
            ),
        )?;
        for card in cards {
            insert_card(&tx, card)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_note(&self, note_id: &NoteId) -> Fallible<Option<Note>> {
        let conn = self.acquire();
        let sql = "select note_id, deck_id, front, back, meta, created_at from notes where note_id = ?;";
        let mut stmt = conn.prepare(sql)?;
        let note = stmt.query_row((note_id,), note_from_row).optional()?;
        Ok(note)
    }

    pub fn get_card(&self, card_id: &CardId) -> Fallible<Option<Card>> {
        let conn = self.acquire();
        let sql = "select card_id, note_id, direction, state, due, interval_days, ease, lapses, step_index, last_review from cards where card_id = ?;";
        let mut stmt = conn.prepare(sql)?;
        let card = stmt.query_row((card_id,), card_from_row).optional()?;
        Ok(card)
    }

    /// Set a card's state without touching its scheduling fields. Returns
    /// false when no such card exists.
    pub fn set_card_state(&self, card_id: &CardId, state: CardState) -> Fallible<bool> {
        let conn = self.acquire();
        let changed = conn.execute(
            "update cards set state = ? where card_id = ?;",
            (state, card_id),
        )?;
        Ok(changed > 0)
    }

    /// Learning cards due before `horizon`, soonest first.
    pub fn due_learning(&self, deck_ids: &[DeckId], horizon: Timestamp) -> Fallible<Vec<CardView>> {
        self.queue_query(deck_ids, CardState::Learning, Some(horizon), "c.due")
    }

    /// Review cards due at `now`, most overdue first.
    pub fn due_review(&self, deck_ids: &[DeckId], now: Timestamp) -> Fallible<Vec<CardView>> {
        self.queue_query(deck_ids, CardState::Review, Some(now), "c.due")
    }

    /// Cards that have never been studied, in insertion order.
    pub fn unseen(&self, deck_ids: &[DeckId]) -> Fallible<Vec<CardView>> {
        self.queue_query(deck_ids, CardState::New, None, "n.created_at, n.rowid")
    }

    fn queue_query(
        &self,
        deck_ids: &[DeckId],
        state: CardState,
        due_before: Option<Timestamp>,
        order_by: &str,
    ) -> Fallible<Vec<CardView>> {
        if deck_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; deck_ids.len()].join(", ");
        let mut sql = format!(
            "select c.card_id, c.note_id, n.deck_id, d.name, c.direction, n.front, n.back, n.meta, c.state, c.due, c.interval_days, c.ease, c.lapses, c.step_index \
             from cards c \
             join notes n on n.note_id = c.note_id \
             join decks d on d.deck_id = n.deck_id \
             where n.deck_id in ({placeholders}) and c.state = ?"
        );
        if due_before.is_some() {
            sql.push_str(" and c.due <= ?");
        }
        sql.push_str(&format!(" order by {order_by};"));

        let mut params: Vec<SqlValue> = deck_ids
            .iter()
            .map(|id| SqlValue::from(id.as_str().to_string()))
            .collect();
        params.push(SqlValue::from(state.as_str().to_string()));
        if let Some(due) = due_before {
            params.push(SqlValue::from(due.unix()));
        }

        let conn = self.acquire();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut views = Vec::new();
        while let Some(row) = rows.next()? {
            views.push(card_view_from_row(row)?);
        }
        Ok(views)
    }

    /// Persist a graded review: rewrite the card's scheduling fields,
    /// append the log entry, and bump the day's counters, atomically.
    pub fn apply_review(
        &self,
        card_id: &CardId,
        transition: &Transition,
        reviewed_at: Timestamp,
        entry: &ReviewLogEntry,
        deck_id: &DeckId,
        study_date: StudyDate,
    ) -> Fallible<()> {
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        tx.execute(
            "update cards set state = ?, due = ?, interval_days = ?, ease = ?, lapses = ?, step_index = ?, last_review = ? where card_id = ?;",
            (
                transition.state,
                transition.due,
                transition.interval_days,
                transition.ease,
                transition.lapses,
                transition.step_index as i64,
                reviewed_at,
                card_id,
            ),
        )?;
        insert_review_log(&tx, entry)?;
        let (new_delta, rev_delta) = match entry.prev_state {
            CardState::New => (1, 0),
            CardState::Learning | CardState::Review => (0, 1),
            CardState::Suspended => (0, 0),
        };
        bump_daily_stats(&tx, deck_id, study_date, new_delta, rev_delta)?;
        tx.commit()?;
        Ok(())
    }

    /// Append a log entry without touching the card. Used when grading a
    /// suspended card, which is accepted but changes nothing.
    pub fn append_review_log(&self, entry: &ReviewLogEntry) -> Fallible<()> {
        let mut conn = self.acquire();
        let tx = conn.transaction()?;
        insert_review_log(&tx, entry)?;
        tx.commit()?;
        Ok(())
    }

    /// A card's review history, oldest first.
    pub fn review_log(&self, card_id: &CardId) -> Fallible<Vec<ReviewLogEntry>> {
        let conn = self.acquire();
        let sql = "select card_id, reviewed_at, rating, answer_ms, prev_state, prev_interval, next_interval from review_log where card_id = ? order by reviewed_at, review_id;";
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query((card_id,))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(ReviewLogEntry {
                card_id: row.get(0)?,
                reviewed_at: row.get(1)?,
                rating: row.get(2)?,
                answer_ms: row.get(3)?,
                prev_state: row.get(4)?,
                prev_interval: row.get(5)?,
                next_interval: row.get(6)?,
            });
        }
        Ok(entries)
    }

    /// The day's counters for one deck. Missing rows read as zero.
    pub fn daily_stats(&self, deck_id: &DeckId, study_date: StudyDate) -> Fallible<(u32, u32)> {
        let conn = self.acquire();
        let sql = "select new_studied, rev_studied from daily_stats where deck_id = ? and study_date = ?;";
        let mut stmt = conn.prepare(sql)?;
        let counts = stmt
            .query_row((deck_id, study_date), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        Ok(counts.unwrap_or((0, 0)))
    }

    /// Count cards due at `now` by state, excluding suspended cards.
    pub fn state_counts(
        &self,
        deck_ids: &[DeckId],
        now: Timestamp,
    ) -> Fallible<(usize, usize, usize)> {
        if deck_ids.is_empty() {
            return Ok((0, 0, 0));
        }
        let placeholders = vec!["?"; deck_ids.len()].join(", ");
        let sql = format!(
            "select c.state, count(*) \
             from cards c \
             join notes n on n.note_id = c.note_id \
             where n.deck_id in ({placeholders}) and c.due <= ? and c.state != 'suspended' \
             group by c.state;"
        );
        let mut params: Vec<SqlValue> = deck_ids
            .iter()
            .map(|id| SqlValue::from(id.as_str().to_string()))
            .collect();
        params.push(SqlValue::from(now.unix()));

        let conn = self.acquire();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let (mut new, mut learning, mut review) = (0, 0, 0);
        while let Some(row) = rows.next()? {
            let state: CardState = row.get(0)?;
            let count: usize = row.get::<_, i64>(1)? as usize;
            match state {
                CardState::New => new = count,
                CardState::Learning => learning = count,
                CardState::Review => review = count,
                CardState::Suspended => {}
            }
        }
        Ok((new, learning, review))
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

fn insert_card(tx: &Transaction, card: &Card) -> Fallible<()> {
    let sql = "insert into cards (card_id, note_id, direction, state, due, interval_days, ease, lapses, step_index, last_review) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?);";
    tx.execute(
        sql,
        (
            &card.card_id,
            &card.note_id,
            card.direction,
            card.state,
            card.due,
            card.interval_days,
            card.ease,
            card.lapses,
            card.step_index as i64,
            card.last_review,
        ),
    )?;
    Ok(())
}

fn insert_review_log(tx: &Transaction, entry: &ReviewLogEntry) -> Fallible<()> {
    let sql = "insert into review_log (card_id, reviewed_at, rating, answer_ms, prev_state, prev_interval, next_interval) values (?, ?, ?, ?, ?, ?, ?);";
    tx.execute(
        sql,
        (
            &entry.card_id,
            entry.reviewed_at,
            entry.rating,
            entry.answer_ms,
            entry.prev_state,
            entry.prev_interval,
            entry.next_interval,
        ),
    )?;
    Ok(())
}

fn bump_daily_stats(
    tx: &Transaction,
    deck_id: &DeckId,
    study_date: StudyDate,
    new_delta: u32,
    rev_delta: u32,
) -> Fallible<()> {
    let sql = "insert into daily_stats (deck_id, study_date, new_studied, rev_studied) values (?, ?, ?, ?) \
               on conflict (deck_id, study_date) do update set new_studied = new_studied + excluded.new_studied, rev_studied = rev_studied + excluded.rev_studied;";
    tx.execute(sql, (deck_id, study_date, new_delta, rev_delta))?;
    Ok(())
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    let prefs_json: String = row.get(3)?;
    let prefs: DeckPrefs = serde_json::from_str(&prefs_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Deck {
        deck_id: row.get(0)?,
        name: row.get(1)?,
        is_builtin: row.get(2)?,
        prefs,
    })
}

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    let meta = parse_meta(row, 4)?;
    Ok(Note {
        note_id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        meta,
        created_at: row.get(5)?,
    })
}

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        card_id: row.get(0)?,
        note_id: row.get(1)?,
        direction: row.get(2)?,
        state: row.get(3)?,
        due: row.get(4)?,
        interval_days: row.get(5)?,
        ease: row.get(6)?,
        lapses: row.get(7)?,
        step_index: row.get::<_, i64>(8)? as usize,
        last_review: row.get(9)?,
    })
}

fn card_view_from_row(row: &Row) -> rusqlite::Result<CardView> {
    let meta = parse_meta(row, 7)?;
    Ok(CardView {
        card_id: row.get(0)?,
        note_id: row.get(1)?,
        deck_id: row.get(2)?,
        deck_name: row.get(3)?,
        direction: row.get(4)?,
        front: row.get(5)?,
        back: row.get(6)?,
        meta,
        state: row.get(8)?,
        due: row.get(9)?,
        interval_days: row.get(10)?,
        ease: row.get(11)?,
        lapses: row.get(12)?,
        step_index: row.get::<_, i64>(13)? as usize,
    })
}

fn parse_meta(row: &Row, index: usize) -> rusqlite::Result<Option<Value>> {
    let meta_json: Option<String> = row.get(index)?;
    match meta_json {
        Some(json) => {
            let value = serde_json::from_str(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    index,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn probe_schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["decks"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sm2::DEFAULT_EASE;
    use crate::types::card::Direction;
    use crate::types::rating::Rating;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn note(deck_id: &DeckId, front: &str) -> Note {
        Note {
            note_id: NoteId::generate(),
            deck_id: deck_id.clone(),
            front: front.to_string(),
            back: format!("{front} (back)"),
            meta: None,
            created_at: Timestamp::from_unix(1000),
        }
    }

    fn new_card(note: &Note, direction: Direction) -> Card {
        Card {
            card_id: CardId::generate(),
            note_id: note.note_id.clone(),
            direction,
            state: CardState::New,
            due: note.created_at,
            interval_days: 0.0,
            ease: DEFAULT_EASE,
            lapses: 0,
            step_index: 0,
            last_review: None,
        }
    }

    fn study_date() -> StudyDate {
        StudyDate::new(chrono::NaiveDate::from_ymd_opt(2026, 3, 10).unwrap())
    }

    #[test]
    fn test_database_persists_across_reopen() -> Fallible<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kartei.db");
        let path = path.to_str().unwrap();
        let deck_id = {
            let db = Database::new(path)?;
            db.create_deck("German", false, &DeckPrefs::default())?
        };
        let db = Database::new(path)?;
        assert!(db.get_deck(&deck_id)?.is_some());
        Ok(())
    }

    #[test]
    fn test_deck_round_trip() -> Fallible<()> {
        let db = db();
        let prefs = DeckPrefs {
            new_per_day: 5,
            rev_per_day: 50,
            steps_min: vec![1, 10],
            bidirectional: true,
        };
        let deck_id = db.create_deck("German", false, &prefs)?;
        let deck = db.get_deck(&deck_id)?.unwrap();
        assert_eq!(deck.name, "German");
        assert!(!deck.is_builtin);
        assert_eq!(deck.prefs, prefs);
        assert!(db.get_deck(&DeckId::generate())?.is_none());
        Ok(())
    }

    #[test]
    fn test_find_deck_by_name() -> Fallible<()> {
        let db = db();
        db.create_deck("German", false, &DeckPrefs::default())?;
        assert!(db.find_deck_by_name("German")?.is_some());
        assert!(db.find_deck_by_name("Klingon")?.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_deck_name_is_an_error() -> Fallible<()> {
        let db = db();
        db.create_deck("German", false, &DeckPrefs::default())?;
        assert!(db.create_deck("German", false, &DeckPrefs::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_update_deck_prefs() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let mut prefs = DeckPrefs::default();
        prefs.new_per_day = 3;
        assert!(db.update_deck_prefs(&deck_id, &prefs)?);
        assert_eq!(db.get_deck(&deck_id)?.unwrap().prefs.new_per_day, 3);
        assert!(!db.update_deck_prefs(&DeckId::generate(), &prefs)?);
        Ok(())
    }

    #[test]
    fn test_note_and_cards_round_trip() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let mut note = note(&deck_id, "Hund");
        note.meta = Some(json!({"class": "noun", "plural": "Hunde"}));
        let cards = vec![
            new_card(&note, Direction::Forward),
            new_card(&note, Direction::Reverse),
        ];
        db.insert_note(&note, &cards)?;

        let loaded = db.get_note(&note.note_id)?.unwrap();
        assert_eq!(loaded.front, "Hund");
        assert_eq!(loaded.meta, note.meta);
        assert_eq!(loaded.created_at, note.created_at);

        let card = db.get_card(&cards[0].card_id)?.unwrap();
        assert_eq!(card.direction, Direction::Forward);
        assert_eq!(card.state, CardState::New);
        assert_eq!(card.interval_days, 0.0);
        assert_eq!(card.last_review, None);
        Ok(())
    }

    #[test]
    fn test_duplicate_direction_is_an_error() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let note = note(&deck_id, "Hund");
        let cards = vec![
            new_card(&note, Direction::Forward),
            new_card(&note, Direction::Forward),
        ];
        assert!(db.insert_note(&note, &cards).is_err());
        Ok(())
    }

    #[test]
    fn test_queue_queries() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let now = Timestamp::from_unix(10_000);

        let fresh = note(&deck_id, "neu");
        db.insert_note(&fresh, &[new_card(&fresh, Direction::Forward)])?;

        let learning_note = note(&deck_id, "lernen");
        let mut learning = new_card(&learning_note, Direction::Forward);
        learning.state = CardState::Learning;
        learning.due = now.add_minutes(10);
        db.insert_note(&learning_note, &[learning.clone()])?;

        let review_note = note(&deck_id, "prüfen");
        let mut review = new_card(&review_note, Direction::Forward);
        review.state = CardState::Review;
        review.due = now.add_secs(-100);
        db.insert_note(&review_note, &[review.clone()])?;

        let suspended_note = note(&deck_id, "ruhen");
        let mut suspended = new_card(&suspended_note, Direction::Forward);
        suspended.state = CardState::Suspended;
        suspended.due = now.add_secs(-100);
        db.insert_note(&suspended_note, &[suspended])?;

        let deck_ids = [deck_id];

        // The learning card is outside a 5-minute horizon, inside a
        // 30-minute one.
        assert!(db.due_learning(&deck_ids, now.add_secs(300))?.is_empty());
        let pool = db.due_learning(&deck_ids, now.add_secs(1800))?;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].card_id, learning.card_id);

        let pool = db.due_review(&deck_ids, now)?;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].card_id, review.card_id);

        let pool = db.unseen(&deck_ids)?;
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].front, "neu");

        assert!(db.unseen(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_apply_review_round_trip() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let n = note(&deck_id, "Hund");
        let card = new_card(&n, Direction::Forward);
        db.insert_note(&n, &[card.clone()])?;

        let now = Timestamp::from_unix(50_000);
        let transition = Transition {
            state: CardState::Learning,
            due: now.add_minutes(10),
            interval_days: 0.0,
            ease: DEFAULT_EASE,
            lapses: 0,
            step_index: 0,
        };
        let entry = ReviewLogEntry {
            card_id: card.card_id.clone(),
            reviewed_at: now,
            rating: Rating::Good,
            answer_ms: 4200,
            prev_state: CardState::New,
            prev_interval: 0.0,
            next_interval: 0.0,
        };
        db.apply_review(&card.card_id, &transition, now, &entry, &deck_id, study_date())?;

        let loaded = db.get_card(&card.card_id)?.unwrap();
        assert_eq!(loaded.state, transition.state);
        assert_eq!(loaded.due, transition.due);
        assert_eq!(loaded.interval_days, transition.interval_days);
        assert_eq!(loaded.ease, transition.ease);
        assert_eq!(loaded.lapses, transition.lapses);
        assert_eq!(loaded.step_index, transition.step_index);
        assert_eq!(loaded.last_review, Some(now));

        let log = db.review_log(&card.card_id)?;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].rating, Rating::Good);
        assert_eq!(log[0].answer_ms, 4200);
        assert_eq!(log[0].prev_state, CardState::New);

        assert_eq!(db.daily_stats(&deck_id, study_date())?, (1, 0));
        Ok(())
    }

    #[test]
    fn test_daily_stats_accumulate() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let mut conn = db.acquire();
        let tx = conn.transaction()?;
        bump_daily_stats(&tx, &deck_id, study_date(), 1, 0)?;
        bump_daily_stats(&tx, &deck_id, study_date(), 0, 1)?;
        bump_daily_stats(&tx, &deck_id, study_date(), 1, 2)?;
        tx.commit()?;
        drop(conn);
        assert_eq!(db.daily_stats(&deck_id, study_date())?, (2, 3));
        Ok(())
    }

    #[test]
    fn test_state_counts_exclude_suspended() -> Fallible<()> {
        let db = db();
        let deck_id = db.create_deck("German", false, &DeckPrefs::default())?;
        let now = Timestamp::from_unix(10_000);
        for (name, state) in [
            ("a", CardState::New),
            ("b", CardState::Learning),
            ("c", CardState::Review),
            ("d", CardState::Suspended),
        ] {
            let n = note(&deck_id, name);
            let mut card = new_card(&n, Direction::Forward);
            card.state = state;
            card.due = now.add_secs(-10);
            db.insert_note(&n, &[card])?;
        }
        assert_eq!(db.state_counts(&[deck_id], now)?, (1, 1, 1));
        Ok(())
    }
}
