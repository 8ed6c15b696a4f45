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

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::Value;

use crate::config::SchedulerConfig;
use crate::db::Database;
use crate::error::Fallible;
use crate::error::fail;
use crate::session;
use crate::session::Pools;
use crate::sm2;
use crate::types::card::Card;
use crate::types::card::CardId;
use crate::types::card::CardState;
use crate::types::card::Direction;
use crate::types::card_view::CardView;
use crate::types::deck::Deck;
use crate::types::deck::DeckId;
use crate::types::deck::DeckPrefs;
use crate::types::deck::PartialPrefs;
use crate::types::note::Note;
use crate::types::note::NoteId;
use crate::types::note::validate_meta;
use crate::types::rating::Rating;
use crate::types::review::ReviewLogEntry;
use crate::types::study_date::StudyDate;
use crate::types::timestamp::Timestamp;

/// The scheduling engine: owns the store and the randomness source. Time
/// is always passed in by the caller, so scheduling is reproducible under
/// test with a seeded configuration.
pub struct Scheduler {
    db: Database,
    rng: StdRng,
    rollover_hour: u32,
}

/// A snapshot of today's workload across a set of decks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCounts {
    /// Cards due now, by state.
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub total: usize,
    /// Today's gradings so far.
    pub new_studied: u32,
    pub rev_studied: u32,
    /// What the daily limits still allow.
    pub new_remaining: u32,
    pub rev_remaining: u32,
    /// When the current study day ends and the quotas reset.
    pub next_rollover: Timestamp,
}

impl Scheduler {
    pub fn new(db: Database) -> Self {
        Self::with_config(db, SchedulerConfig::default())
    }

    pub fn with_config(db: Database, config: SchedulerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            db,
            rng,
            rollover_hour: config.rollover_hour.min(23),
        }
    }

    pub fn create_collection(&self, name: &str, prefs: DeckPrefs) -> Fallible<DeckId> {
        let deck_id = self.db.create_deck(name, false, &prefs.normalized())?;
        log::debug!("Created deck {deck_id} ({name}).");
        Ok(deck_id)
    }

    pub fn get_collection(&self, deck_id: &DeckId) -> Fallible<Deck> {
        match self.db.get_deck(deck_id)? {
            Some(deck) => Ok(deck),
            None => fail(format!("no such deck: {deck_id}")),
        }
    }

    pub fn list_collections(&self) -> Fallible<Vec<Deck>> {
        self.db.list_decks()
    }

    /// Merge a preferences update into a deck. Changing `new_per_day`
    /// re-derives `rev_per_day` unless the update overrides it explicitly.
    pub fn update_preferences(&self, deck_id: &DeckId, partial: PartialPrefs) -> Fallible<Deck> {
        let mut deck = self.get_collection(deck_id)?;
        deck.prefs = partial.apply(deck.prefs);
        self.db.update_deck_prefs(deck_id, &deck.prefs)?;
        Ok(deck)
    }

    /// Add a note, creating a forward card and, for bidirectional decks, a
    /// reverse card, atomically.
    pub fn add_item(
        &self,
        deck_id: &DeckId,
        front: &str,
        back: &str,
        meta: Option<Value>,
        now: Timestamp,
    ) -> Fallible<NoteId> {
        let deck = self.get_collection(deck_id)?;
        if let Some(meta) = &meta {
            validate_meta(meta)?;
        }
        let note = Note {
            note_id: NoteId::generate(),
            deck_id: deck_id.clone(),
            front: front.to_string(),
            back: back.to_string(),
            meta,
            created_at: now,
        };
        let mut cards = vec![new_card(&note, Direction::Forward, now)];
        if deck.prefs.bidirectional {
            cards.push(new_card(&note, Direction::Reverse, now));
        }
        self.db.insert_note(&note, &cards)?;
        log::debug!(
            "Added note {} to deck {} ({} cards).",
            note.note_id,
            deck.name,
            cards.len()
        );
        Ok(note.note_id)
    }

    /// Import notes from JSON-lines text. Each line must be an object with
    /// `front` and `back`; any remaining keys become the note's metadata.
    /// Malformed lines are skipped. Returns the number imported.
    pub fn import_items(&self, deck_id: &DeckId, text: &str, now: Timestamp) -> Fallible<usize> {
        let mut imported = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Skipping invalid JSON line: {e}");
                    continue;
                }
            };
            let Some(object) = value.as_object() else {
                log::warn!("Skipping non-object line.");
                continue;
            };
            let front = object.get("front").and_then(Value::as_str);
            let back = object.get("back").and_then(Value::as_str);
            let (Some(front), Some(back)) = (front, back) else {
                log::warn!("Skipping line without front/back.");
                continue;
            };
            let front = front.to_string();
            let back = back.to_string();
            let mut extra = object.clone();
            extra.remove("front");
            extra.remove("back");
            let meta = if extra.is_empty() {
                None
            } else {
                Some(Value::Object(extra))
            };
            self.add_item(deck_id, &front, &back, meta, now)?;
            imported += 1;
        }
        Ok(imported)
    }

    /// Assemble the presentation queue for a set of decks. The queue is a
    /// pure read: it goes stale as soon as any card in it is graded, so
    /// callers should rebuild after grading.
    pub fn build_session(
        &mut self,
        deck_ids: &[DeckId],
        now: Timestamp,
        max_new: Option<usize>,
        max_rev: Option<usize>,
    ) -> Fallible<Vec<CardView>> {
        let study_date = StudyDate::from_timestamp(now, self.rollover_hour);
        let mut new_quota: usize = 0;
        let mut rev_quota: usize = 0;
        for deck_id in deck_ids {
            let deck = self.get_collection(deck_id)?;
            let prefs = deck.prefs.normalized();
            let (new_studied, rev_studied) = self.db.daily_stats(deck_id, study_date)?;
            new_quota += prefs.new_per_day.saturating_sub(new_studied) as usize;
            rev_quota += prefs.rev_per_day.saturating_sub(rev_studied) as usize;
        }
        if let Some(max) = max_new {
            new_quota = new_quota.min(max);
        }
        if let Some(max) = max_rev {
            rev_quota = rev_quota.min(max);
        }

        let pools = Pools {
            learning: self
                .db
                .due_learning(deck_ids, now.add_secs(session::LEARN_AHEAD_SECS))?,
            review: self.db.due_review(deck_ids, now)?,
            new: self.db.unseen(deck_ids)?,
        };
        let queue = session::assemble(pools, new_quota, rev_quota, &mut self.rng);
        log::debug!(
            "Built session of {} cards across {} decks.",
            queue.len(),
            deck_ids.len()
        );
        Ok(queue)
    }

    /// Grade a card: compute the transition, persist it, append the review
    /// log entry, and bump the day's counters. Grading a suspended card is
    /// accepted but leaves the card untouched; the review is still logged.
    pub fn grade_review(
        &mut self,
        card_id: &CardId,
        rating: Rating,
        answer_ms: u32,
        now: Timestamp,
    ) -> Fallible<()> {
        let card = match self.db.get_card(card_id)? {
            Some(card) => card,
            None => return fail(format!("no such card: {card_id}")),
        };
        let note = match self.db.get_note(&card.note_id)? {
            Some(note) => note,
            None => return fail(format!("no such note: {}", card.note_id)),
        };
        let deck = self.get_collection(&note.deck_id)?;
        let steps = deck.prefs.normalized().steps_min;

        match sm2::transition(&card, rating, now, &steps, &mut self.rng) {
            Some(transition) => {
                let entry = ReviewLogEntry {
                    card_id: card_id.clone(),
                    reviewed_at: now,
                    rating,
                    answer_ms,
                    prev_state: card.state,
                    prev_interval: card.interval_days,
                    next_interval: transition.interval_days,
                };
                let study_date = StudyDate::from_timestamp(now, self.rollover_hour);
                self.db
                    .apply_review(card_id, &transition, now, &entry, &deck.deck_id, study_date)?;
                log::debug!(
                    "{} {} -> {} interval={:.2}d ease={:.2}",
                    card_id,
                    rating.as_str(),
                    transition.state.as_str(),
                    transition.interval_days,
                    transition.ease
                );
            }
            None => {
                let entry = ReviewLogEntry {
                    card_id: card_id.clone(),
                    reviewed_at: now,
                    rating,
                    answer_ms,
                    prev_state: card.state,
                    prev_interval: card.interval_days,
                    next_interval: card.interval_days,
                };
                self.db.append_review_log(&entry)?;
                log::debug!("{card_id} is suspended; rating accepted, card unchanged.");
            }
        }
        Ok(())
    }

    /// Exclude a card from all candidate pools until unsuspended.
    pub fn suspend(&self, card_id: &CardId) -> Fallible<()> {
        if !self.db.set_card_state(card_id, CardState::Suspended)? {
            return fail(format!("no such card: {card_id}"));
        }
        Ok(())
    }

    /// Return a suspended card to the queue: never-reviewed cards go back
    /// to new, cards still in their learning steps to learning, graduated
    /// cards to review.
    pub fn unsuspend(&self, card_id: &CardId) -> Fallible<()> {
        let card = match self.db.get_card(card_id)? {
            Some(card) => card,
            None => return fail(format!("no such card: {card_id}")),
        };
        if card.state != CardState::Suspended {
            return Ok(());
        }
        let state = if card.last_review.is_none() {
            CardState::New
        } else if card.interval_days == 0.0 {
            CardState::Learning
        } else {
            CardState::Review
        };
        self.db.set_card_state(card_id, state)?;
        Ok(())
    }

    /// Today's workload: cards due now by state, plus the day's counters
    /// and what the daily limits still allow.
    pub fn get_daily_stats(&self, deck_ids: &[DeckId], now: Timestamp) -> Fallible<StudyCounts> {
        let (new, learning, review) = self.db.state_counts(deck_ids, now)?;
        let study_date = StudyDate::from_timestamp(now, self.rollover_hour);
        let mut counts = StudyCounts {
            new,
            learning,
            review,
            total: new + learning + review,
            new_studied: 0,
            rev_studied: 0,
            new_remaining: 0,
            rev_remaining: 0,
            next_rollover: StudyDate::next_rollover(now, self.rollover_hour),
        };
        for deck_id in deck_ids {
            let deck = self.get_collection(deck_id)?;
            let prefs = deck.prefs.normalized();
            let (new_studied, rev_studied) = self.db.daily_stats(deck_id, study_date)?;
            counts.new_studied += new_studied;
            counts.rev_studied += rev_studied;
            counts.new_remaining += prefs.new_per_day.saturating_sub(new_studied);
            counts.rev_remaining += prefs.rev_per_day.saturating_sub(rev_studied);
        }
        Ok(counts)
    }
}

fn new_card(note: &Note, direction: Direction, now: Timestamp) -> Card {
    Card {
        card_id: CardId::generate(),
        note_id: note.note_id.clone(),
        direction,
        state: CardState::New,
        due: now,
        interval_days: 0.0,
        ease: sm2::DEFAULT_EASE,
        lapses: 0,
        step_index: 0,
        last_review: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn scheduler() -> Scheduler {
        let db = Database::open_in_memory().unwrap();
        let config = SchedulerConfig {
            rollover_hour: 4,
            seed: Some(7),
        };
        Scheduler::with_config(db, config)
    }

    fn now() -> Timestamp {
        Timestamp::from_unix(NOW)
    }

    fn local_ts(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        let dt = Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap();
        Timestamp::from_unix(dt.timestamp())
    }

    fn deck_with(scheduler: &Scheduler, prefs: DeckPrefs) -> DeckId {
        scheduler.create_collection("German", prefs).unwrap()
    }

    #[test]
    fn test_add_item_creates_one_card_per_direction() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                bidirectional: true,
                ..DeckPrefs::default()
            },
        );
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id], now(), None, None)?;
        assert_eq!(queue.len(), 2);
        let directions: Vec<Direction> = queue.iter().map(|c| c.direction).collect();
        assert!(directions.contains(&Direction::Forward));
        assert!(directions.contains(&Direction::Reverse));
        Ok(())
    }

    #[test]
    fn test_add_item_to_unknown_deck_fails() {
        let s = scheduler();
        let result = s.add_item(&DeckId::generate(), "Hund", "dog", None, now());
        assert!(result.is_err());
    }

    #[test]
    fn test_add_item_rejects_non_object_meta() {
        let s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        let result = s.add_item(&deck_id, "Hund", "dog", Some(json!("noun")), now());
        assert!(result.is_err());
    }

    #[test]
    fn test_import_items_skips_bad_lines() -> Fallible<()> {
        let s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        let text = r#"
            {"front": "Hund", "back": "dog", "class": "noun"}
            not json at all
            {"front": "no back here"}
            42
            {"front": "laufen", "back": "to run"}
        "#;
        let imported = s.import_items(&deck_id, text, now())?;
        assert_eq!(imported, 2);
        Ok(())
    }

    #[test]
    fn test_grade_review_round_trip() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                steps_min: vec![1, 10],
                ..DeckPrefs::default()
            },
        );
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let card_id = queue[0].card_id.clone();

        s.grade_review(&card_id, Rating::Good, 4200, now())?;

        // Re-reading the card yields exactly the fields the state machine
        // computed.
        let card = s.db.get_card(&card_id)?.unwrap();
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due, now().add_minutes(1));
        assert_eq!(card.interval_days, 0.0);
        assert_eq!(card.ease, sm2::DEFAULT_EASE);
        assert_eq!(card.last_review, Some(now()));

        let log = s.db.review_log(&card_id)?;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].prev_state, CardState::New);
        assert_eq!(log[0].answer_ms, 4200);
        Ok(())
    }

    #[test]
    fn test_grade_unknown_card_fails() {
        let mut s = scheduler();
        let result = s.grade_review(&CardId::generate(), Rating::Good, 0, now());
        assert!(result.is_err());
    }

    #[test]
    fn test_new_quota_enforced_across_gradings() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                new_per_day: 3,
                ..DeckPrefs::default()
            },
        );
        for i in 0..10 {
            s.add_item(&deck_id, &format!("wort{i}"), "word", None, now())?;
        }

        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let new_cards: Vec<CardId> = queue
            .iter()
            .filter(|c| c.state == CardState::New)
            .map(|c| c.card_id.clone())
            .collect();
        assert_eq!(new_cards.len(), 3);

        for card_id in &new_cards {
            s.grade_review(card_id, Rating::Good, 1000, now())?;
        }

        // The day's quota is spent: no more new cards, even though seven
        // are waiting.
        let queue = s.build_session(&[deck_id], now(), None, None)?;
        assert!(queue.iter().all(|c| c.state != CardState::New));
        Ok(())
    }

    #[test]
    fn test_caller_maxima_further_cap_the_queue() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        for i in 0..10 {
            s.add_item(&deck_id, &format!("wort{i}"), "word", None, now())?;
        }
        let queue = s.build_session(&[deck_id], now(), Some(2), None)?;
        assert_eq!(queue.len(), 2);
        Ok(())
    }

    #[test]
    fn test_quota_resets_after_rollover() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                new_per_day: 1,
                ..DeckPrefs::default()
            },
        );
        let evening = local_ts(2026, 3, 9, 22);
        for i in 0..2 {
            s.add_item(&deck_id, &format!("wort{i}"), "word", None, evening)?;
        }
        let queue = s.build_session(&[deck_id.clone()], evening, None, None)?;
        let new_card = queue
            .iter()
            .find(|c| c.state == CardState::New)
            .unwrap()
            .card_id
            .clone();
        s.grade_review(&new_card, Rating::Easy, 1000, evening)?;

        // 2 AM is still the same study day, so the quota stays spent.
        let late_night = local_ts(2026, 3, 10, 2);
        let queue = s.build_session(&[deck_id.clone()], late_night, None, None)?;
        assert!(queue.iter().all(|c| c.state != CardState::New));

        // After the 4 AM rollover the quota is fresh.
        let morning = local_ts(2026, 3, 10, 9);
        let queue = s.build_session(&[deck_id], morning, None, None)?;
        assert!(queue.iter().any(|c| c.state == CardState::New));
        Ok(())
    }

    #[test]
    fn test_suspended_grading_is_logged_but_changes_nothing() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let card_id = queue[0].card_id.clone();

        s.suspend(&card_id)?;
        let before = s.db.get_card(&card_id)?.unwrap();
        s.grade_review(&card_id, Rating::Good, 1000, now())?;

        let after = s.db.get_card(&card_id)?.unwrap();
        assert_eq!(after.state, CardState::Suspended);
        assert_eq!(after.due, before.due);
        assert_eq!(after.ease, before.ease);
        assert_eq!(after.last_review, before.last_review);

        let log = s.db.review_log(&card_id)?;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].prev_state, CardState::Suspended);

        // Suspended gradings do not touch the daily counters.
        let counts = s.get_daily_stats(&[deck_id], now())?;
        assert_eq!(counts.new_studied, 0);
        assert_eq!(counts.rev_studied, 0);
        Ok(())
    }

    #[test]
    fn test_suspended_cards_leave_the_queue() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let card_id = queue[0].card_id.clone();

        s.suspend(&card_id)?;
        assert!(s.build_session(&[deck_id.clone()], now(), None, None)?.is_empty());

        s.unsuspend(&card_id)?;
        let queue = s.build_session(&[deck_id], now(), None, None)?;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].state, CardState::New);
        Ok(())
    }

    #[test]
    fn test_unsuspend_restores_review_state_for_graduated_cards() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let card_id = queue[0].card_id.clone();

        s.grade_review(&card_id, Rating::Easy, 1000, now())?;
        s.suspend(&card_id)?;
        s.unsuspend(&card_id)?;
        let card = s.db.get_card(&card_id)?.unwrap();
        assert_eq!(card.state, CardState::Review);
        Ok(())
    }

    #[test]
    fn test_daily_stats_distinguish_new_from_review_gradings() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                steps_min: vec![1],
                ..DeckPrefs::default()
            },
        );
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        let card_id = queue[0].card_id.clone();

        s.grade_review(&card_id, Rating::Good, 1000, now())?;
        let counts = s.get_daily_stats(&[deck_id.clone()], now())?;
        assert_eq!((counts.new_studied, counts.rev_studied), (1, 0));

        // Now in learning; grading again counts as a review.
        s.grade_review(&card_id, Rating::Good, 1000, now().add_minutes(2))?;
        let counts = s.get_daily_stats(&[deck_id], now())?;
        assert_eq!((counts.new_studied, counts.rev_studied), (1, 1));
        Ok(())
    }

    #[test]
    fn test_get_daily_stats_remaining() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                new_per_day: 2,
                rev_per_day: 20,
                ..DeckPrefs::default()
            },
        );
        for i in 0..3 {
            s.add_item(&deck_id, &format!("wort{i}"), "word", None, now())?;
        }
        let counts = s.get_daily_stats(&[deck_id.clone()], now())?;
        assert_eq!(counts.new, 3);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.new_remaining, 2);
        assert_eq!(counts.rev_remaining, 20);
        assert!(counts.next_rollover > now());

        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        s.grade_review(&queue[0].card_id, Rating::Good, 1000, now())?;
        let counts = s.get_daily_stats(&[deck_id], now())?;
        assert_eq!(counts.new_remaining, 1);
        Ok(())
    }

    #[test]
    fn test_update_preferences_rederives_rev_per_day() -> Fallible<()> {
        let s = scheduler();
        let deck_id = deck_with(&s, DeckPrefs::default());
        let deck = s.update_preferences(
            &deck_id,
            PartialPrefs {
                new_per_day: Some(20),
                ..PartialPrefs::default()
            },
        )?;
        assert_eq!(deck.prefs.new_per_day, 20);
        assert_eq!(deck.prefs.rev_per_day, 200);

        // An explicit override in the same update is respected.
        let deck = s.update_preferences(
            &deck_id,
            PartialPrefs {
                new_per_day: Some(5),
                rev_per_day: Some(80),
                ..PartialPrefs::default()
            },
        )?;
        assert_eq!(deck.prefs.rev_per_day, 80);
        Ok(())
    }

    #[test]
    fn test_learning_cards_surface_within_the_window() -> Fallible<()> {
        let mut s = scheduler();
        let deck_id = deck_with(
            &s,
            DeckPrefs {
                steps_min: vec![10, 1440],
                ..DeckPrefs::default()
            },
        );
        s.add_item(&deck_id, "Hund", "dog", None, now())?;
        let queue = s.build_session(&[deck_id.clone()], now(), None, None)?;
        s.grade_review(&queue[0].card_id, Rating::Good, 1000, now())?;

        // Due in ten minutes: inside the 30-minute learn-ahead window.
        let queue = s.build_session(&[deck_id], now(), None, None)?;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].state, CardState::Learning);
        Ok(())
    }

    #[test]
    fn test_sessions_aggregate_quota_across_decks() -> Fallible<()> {
        let mut s = scheduler();
        let german = s.create_collection(
            "German",
            DeckPrefs {
                new_per_day: 1,
                ..DeckPrefs::default()
            },
        )?;
        let french = s.create_collection(
            "French",
            DeckPrefs {
                new_per_day: 2,
                ..DeckPrefs::default()
            },
        )?;
        for i in 0..5 {
            s.add_item(&german, &format!("g{i}"), "word", None, now())?;
            s.add_item(&french, &format!("f{i}"), "word", None, now())?;
        }
        let queue = s.build_session(&[german, french], now(), None, None)?;
        let new_count = queue.iter().filter(|c| c.state == CardState::New).count();
        assert_eq!(new_count, 3);
        Ok(())
    }
}
