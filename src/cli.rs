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

use std::fs::read_to_string;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use serde_json::Value;

use crate::config::SchedulerConfig;
use crate::db::Database;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::scheduler::Scheduler;
use crate::types::card::CardId;
use crate::types::deck::Deck;
use crate::types::deck::DeckId;
use crate::types::deck::DeckPrefs;
use crate::types::deck::PartialPrefs;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the card database (defaults to the working
    /// directory).
    #[arg(long)]
    directory: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new deck.
    CreateDeck {
        name: String,
        /// New cards introduced per day.
        #[arg(long)]
        new_per_day: Option<u32>,
        /// Also create reverse cards for new notes.
        #[arg(long)]
        bidirectional: bool,
    },
    /// List decks.
    Decks,
    /// Add a note to a deck.
    Add {
        /// Deck name or id.
        deck: String,
        front: String,
        back: String,
        /// Optional metadata as a JSON object.
        #[arg(long)]
        meta: Option<String>,
    },
    /// Import notes from a JSON-lines file.
    Import {
        /// Deck name or id.
        deck: String,
        file: PathBuf,
    },
    /// Build and print today's queue.
    Session {
        /// Deck names or ids; all decks when empty.
        decks: Vec<String>,
        #[arg(long)]
        max_new: Option<usize>,
        #[arg(long)]
        max_rev: Option<usize>,
    },
    /// Grade a card (1 = again, 2 = hard, 3 = good, 4 = easy).
    Grade {
        card_id: String,
        rating: u8,
        /// Time taken to answer, in milliseconds.
        #[arg(long, default_value_t = 0)]
        answer_ms: u32,
        /// Interpret the rating on the older three-level scale
        /// (0 = missed, 1 = almost, 2 = got it).
        #[arg(long)]
        legacy: bool,
    },
    /// Exclude a card from sessions.
    Suspend { card_id: String },
    /// Return a suspended card to the queue.
    Unsuspend { card_id: String },
    /// Update a deck's daily limits.
    SetLimits {
        /// Deck name or id.
        deck: String,
        #[arg(long)]
        new_per_day: Option<u32>,
        #[arg(long)]
        rev_per_day: Option<u32>,
    },
    /// Print today's stats as JSON.
    Stats {
        /// Deck names or ids; all decks when empty.
        decks: Vec<String>,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli = Cli::parse();
    let directory: PathBuf = match &cli.directory {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    if !directory.exists() {
        return fail("directory does not exist.");
    }
    let db_path = directory.join("kartei.db");
    let db_path = db_path
        .to_str()
        .ok_or_else(|| ErrorReport::new("invalid path"))?;
    let db = Database::new(db_path)?;
    let config = SchedulerConfig::load(&directory.join("kartei.toml"))?;
    let mut scheduler = Scheduler::with_config(db, config);
    let now = Timestamp::now();

    match cli.command {
        Command::CreateDeck {
            name,
            new_per_day,
            bidirectional,
        } => {
            let prefs = PartialPrefs {
                new_per_day,
                bidirectional: Some(bidirectional),
                ..PartialPrefs::default()
            }
            .apply(DeckPrefs::default());
            let deck_id = scheduler.create_collection(&name, prefs)?;
            println!("{deck_id}");
        }
        Command::Decks => {
            for deck in scheduler.list_collections()? {
                println!(
                    "{}  {}  new/day={} rev/day={}",
                    deck.deck_id, deck.name, deck.prefs.new_per_day, deck.prefs.rev_per_day
                );
            }
        }
        Command::Add {
            deck,
            front,
            back,
            meta,
        } => {
            let deck = resolve_deck(&scheduler, &deck)?;
            let meta = match meta {
                Some(text) => Some(serde_json::from_str::<Value>(&text)?),
                None => None,
            };
            let note_id = scheduler.add_item(&deck.deck_id, &front, &back, meta, now)?;
            println!("{note_id}");
        }
        Command::Import { deck, file } => {
            let deck = resolve_deck(&scheduler, &deck)?;
            let text = read_to_string(&file)?;
            let imported = scheduler.import_items(&deck.deck_id, &text, now)?;
            println!("Imported {imported} notes.");
        }
        Command::Session {
            decks,
            max_new,
            max_rev,
        } => {
            let deck_ids = resolve_decks(&scheduler, &decks)?;
            let queue = scheduler.build_session(&deck_ids, now, max_new, max_rev)?;
            if queue.is_empty() {
                println!("No cards due.");
            }
            for view in &queue {
                println!(
                    "{}  [{}]  {}",
                    view.card_id,
                    view.state.as_str(),
                    view.prompt()
                );
            }
        }
        Command::Grade {
            card_id,
            rating,
            answer_ms,
            legacy,
        } => {
            let rating = if legacy {
                Rating::from_legacy(rating)?
            } else {
                Rating::from_int(rating)?
            };
            scheduler.grade_review(&CardId::from_string(card_id), rating, answer_ms, now)?;
        }
        Command::Suspend { card_id } => {
            scheduler.suspend(&CardId::from_string(card_id))?;
        }
        Command::Unsuspend { card_id } => {
            scheduler.unsuspend(&CardId::from_string(card_id))?;
        }
        Command::SetLimits {
            deck,
            new_per_day,
            rev_per_day,
        } => {
            let deck = resolve_deck(&scheduler, &deck)?;
            let partial = PartialPrefs {
                new_per_day,
                rev_per_day,
                ..PartialPrefs::default()
            };
            let deck = scheduler.update_preferences(&deck.deck_id, partial)?;
            println!(
                "{}: new/day={} rev/day={}",
                deck.name, deck.prefs.new_per_day, deck.prefs.rev_per_day
            );
        }
        Command::Stats { decks } => {
            let deck_ids = resolve_decks(&scheduler, &decks)?;
            let counts = scheduler.get_daily_stats(&deck_ids, now)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}

/// Look a deck up by name first, then by id.
fn resolve_deck(scheduler: &Scheduler, needle: &str) -> Fallible<Deck> {
    for deck in scheduler.list_collections()? {
        if deck.name == needle || deck.deck_id.as_str() == needle {
            return Ok(deck);
        }
    }
    fail(format!("no such deck: {needle}"))
}

/// Resolve a list of deck arguments; an empty list means all decks.
fn resolve_decks(scheduler: &Scheduler, needles: &[String]) -> Fallible<Vec<DeckId>> {
    if needles.is_empty() {
        return Ok(scheduler
            .list_collections()?
            .into_iter()
            .map(|deck| deck.deck_id)
            .collect());
    }
    let mut deck_ids = Vec::with_capacity(needles.len());
    for needle in needles {
        deck_ids.push(resolve_deck(scheduler, needle)?.deck_id);
    }
    Ok(deck_ids)
}
