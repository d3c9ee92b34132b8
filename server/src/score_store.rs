//! Best-score table with a descending ranking index
//!
//! Every registered player owns exactly one [`HighscoreEntry`]. Entries are
//! guarded individually so that score updates for different players never
//! wait on each other, while a shared ordered index keeps the table
//! scannable from the highest score down.
//!
//! The index is published as an immutable [`RankIndex`] snapshot. Readers
//! load the current snapshot without taking a lock and work on it for as
//! long as they need; writers build the next version and swap it in.

use crate::error::{HighscoreError, Result};
use crate::rank_index::RankIndex;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use log::debug;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// A player's best score as shown on the leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighscoreEntry {
    pub player_id: u32,
    /// Copied from the player at registration
    pub display_name: String,
    pub best_score: u64,
    /// Last time `best_score` was written
    pub updated_at: DateTime<Utc>,
    /// Store-wide sequence stamped whenever `best_score` is written.
    /// Earlier revisions sort first among equal scores.
    pub revision: u64,
}

/// Result of a conditional best-score update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreUpdate {
    Raised {
        previous: u64,
        entry: HighscoreEntry,
    },
    Unchanged(HighscoreEntry),
}

impl ScoreUpdate {
    pub fn entry(&self) -> &HighscoreEntry {
        match self {
            ScoreUpdate::Raised { entry, .. } | ScoreUpdate::Unchanged(entry) => entry,
        }
    }

    pub fn is_raised(&self) -> bool {
        matches!(self, ScoreUpdate::Raised { .. })
    }
}

/// Storage contract for highscore entries.
///
/// `raise_best_score` must be atomic per player: of two concurrent calls
/// for the same player the higher candidate always survives.
pub trait ScoreStore: Send + Sync {
    fn create_entry(&self, player_id: u32, display_name: &str) -> Result<HighscoreEntry>;

    fn get_entry(&self, player_id: u32) -> Result<HighscoreEntry>;

    /// Overwrites the best score unconditionally.
    fn update_best_score(&self, player_id: u32, new_score: u64) -> Result<HighscoreEntry>;

    /// Writes `candidate` only if it is strictly greater than the current best.
    fn raise_best_score(&self, player_id: u32, candidate: u64) -> Result<ScoreUpdate>;

    /// Number of entries whose best score is strictly greater than `score`.
    fn count_above(&self, score: u64) -> Result<usize>;

    /// Number of entries with a best score above zero.
    fn count_ranked(&self) -> Result<usize>;

    /// Entries with a best score above zero in leaderboard order, skipping
    /// `offset` and returning at most `limit`.
    fn ranked(&self, offset: usize, limit: usize) -> Result<Vec<HighscoreEntry>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Ordering key of the ranking index: best score descending, then
/// revision, then player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct RankKey {
    score: Reverse<u64>,
    revision: u64,
    player_id: u32,
}

impl RankKey {
    fn of(entry: &HighscoreEntry) -> Self {
        Self {
            score: Reverse(entry.best_score),
            revision: entry.revision,
            player_id: entry.player_id,
        }
    }

    /// Smallest key holding `score`; every key below it has a higher score.
    fn floor(score: u64) -> Self {
        Self {
            score: Reverse(score),
            revision: 0,
            player_id: 0,
        }
    }
}

type Ranking = RankIndex<RankKey, Arc<HighscoreEntry>>;

/// In-memory [`ScoreStore`].
///
/// Lock order is entry table, then a single entry, then the ranking writer
/// lock. Leaderboard reads take none of them: they load the published
/// ranking snapshot, so a long scan never holds up a submission.
pub struct MemoryScoreStore {
    entries: RwLock<HashMap<u32, Arc<Mutex<HighscoreEntry>>>>,
    ranking: ArcSwap<Ranking>,
    /// Serializes publishing of new ranking versions
    ranking_writer: Mutex<()>,
    next_revision: AtomicU64,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ranking: ArcSwap::from_pointee(Ranking::new()),
            ranking_writer: Mutex::new(()),
            next_revision: AtomicU64::new(1),
        }
    }

    fn entry_slot(&self, player_id: u32) -> Result<Arc<Mutex<HighscoreEntry>>> {
        let entries = self.entries.read()?;
        entries
            .get(&player_id)
            .cloned()
            .ok_or(HighscoreError::NotFound(player_id))
    }

    fn revision(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::Relaxed)
    }

    /// Publishes the ranking produced by `update` from the current one.
    fn update_ranking(&self, update: impl FnOnce(&Ranking) -> Ranking) -> Result<()> {
        let _writer = self.ranking_writer.lock()?;
        let next = update(&self.ranking.load());
        self.ranking.store(Arc::new(next));
        Ok(())
    }

    /// Writes a new best score into a locked entry and moves its index key.
    fn write_best_score(&self, entry: &mut HighscoreEntry, score: u64) -> Result<()> {
        let previous_key = RankKey::of(entry);
        let mut updated = entry.clone();
        updated.best_score = score;
        updated.updated_at = Utc::now();

        self.update_ranking(|ranking| {
            // Stamped inside the writer lock so index order follows write order
            updated.revision = self.revision();
            ranking
                .remove(&previous_key)
                .insert(RankKey::of(&updated), Arc::new(updated.clone()))
        })?;

        *entry = updated;
        Ok(())
    }
}

impl Default for MemoryScoreStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn create_entry(&self, player_id: u32, display_name: &str) -> Result<HighscoreEntry> {
        let mut entries = self.entries.write()?;
        if entries.contains_key(&player_id) {
            return Err(HighscoreError::DuplicateEntry(player_id));
        }

        let mut entry = HighscoreEntry {
            player_id,
            display_name: display_name.to_string(),
            best_score: 0,
            updated_at: Utc::now(),
            revision: 0,
        };

        self.update_ranking(|ranking| {
            entry.revision = self.revision();
            ranking.insert(RankKey::of(&entry), Arc::new(entry.clone()))
        })?;
        entries.insert(player_id, Arc::new(Mutex::new(entry.clone())));

        debug!("Created highscore entry for player {}", player_id);
        Ok(entry)
    }

    fn get_entry(&self, player_id: u32) -> Result<HighscoreEntry> {
        let slot = self.entry_slot(player_id)?;
        let entry = slot.lock()?;
        Ok(entry.clone())
    }

    fn update_best_score(&self, player_id: u32, new_score: u64) -> Result<HighscoreEntry> {
        let slot = self.entry_slot(player_id)?;
        let mut entry = slot.lock()?;
        self.write_best_score(&mut entry, new_score)?;
        Ok(entry.clone())
    }

    fn raise_best_score(&self, player_id: u32, candidate: u64) -> Result<ScoreUpdate> {
        let slot = self.entry_slot(player_id)?;
        let mut entry = slot.lock()?;

        if candidate <= entry.best_score {
            return Ok(ScoreUpdate::Unchanged(entry.clone()));
        }

        let previous = entry.best_score;
        self.write_best_score(&mut entry, candidate)?;
        Ok(ScoreUpdate::Raised {
            previous,
            entry: entry.clone(),
        })
    }

    fn count_above(&self, score: u64) -> Result<usize> {
        Ok(self.ranking.load().count_less(&RankKey::floor(score)))
    }

    fn count_ranked(&self) -> Result<usize> {
        self.count_above(0)
    }

    fn ranked(&self, offset: usize, limit: usize) -> Result<Vec<HighscoreEntry>> {
        let ranking = self.ranking.load_full();
        let ranked = ranking.count_less(&RankKey::floor(0));
        let limit = limit.min(ranked.saturating_sub(offset));

        Ok(ranking
            .range(offset, limit)
            .into_iter()
            .map(|entry| HighscoreEntry::clone(&entry))
            .collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.read()?.len())
    }
}
