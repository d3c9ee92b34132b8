//! Score submission rule and rank computation

use crate::error::{HighscoreError, Result};
use crate::match_log::MatchLog;
use crate::score_store::{HighscoreEntry, ScoreStore, ScoreUpdate};
use chrono::Utc;
use log::{debug, info};
use shared::{MatchRecord, PlayerHighscore};
use std::sync::Arc;

/// What a submission did to the player's highscore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub record: MatchRecord,
    pub current_best_score: u64,
    pub new_best: bool,
}

/// Applies submissions to the score store and answers rank queries.
///
/// Every submitted match is logged; the best score only moves when a
/// strictly higher score arrives. Ranks follow the shared-rank rule
/// `1 + number of players with a strictly higher best score`, so tied
/// players report the same rank and the next rank is skipped.
#[derive(Clone)]
pub struct HighscoreEngine {
    store: Arc<dyn ScoreStore>,
    log: Arc<dyn MatchLog>,
}

impl HighscoreEngine {
    pub fn new(store: Arc<dyn ScoreStore>, log: Arc<dyn MatchLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &Arc<dyn ScoreStore> {
        &self.store
    }

    pub fn match_log(&self) -> &Arc<dyn MatchLog> {
        &self.log
    }

    /// Creates the zero highscore entry for a newly registered player
    pub fn open_entry(&self, player_id: u32, display_name: &str) -> Result<HighscoreEntry> {
        self.store.create_entry(player_id, display_name)
    }

    pub fn submit_match(&self, player_id: u32, score: i64) -> Result<SubmitOutcome> {
        let score = u64::try_from(score).map_err(|_| HighscoreError::InvalidScore(score))?;

        // Unknown players are rejected before anything is logged
        self.store.get_entry(player_id)?;

        let record = self.log.append(player_id, score, Utc::now())?;
        debug!(
            "Player {} submitted match {} with score {}",
            player_id, record.match_id, score
        );

        let update = self.store.raise_best_score(player_id, score)?;
        if let ScoreUpdate::Raised { previous, .. } = &update {
            info!(
                "Player {} raised best score from {} to {}",
                player_id, previous, score
            );
        }

        Ok(SubmitOutcome {
            record,
            current_best_score: update.entry().best_score,
            new_best: update.is_raised(),
        })
    }

    pub fn get_entry(&self, player_id: u32) -> Result<HighscoreEntry> {
        self.store.get_entry(player_id)
    }

    pub fn get_rank(&self, player_id: u32) -> Result<u64> {
        let entry = self.store.get_entry(player_id)?;
        self.rank_of(entry.best_score)
    }

    pub fn player_highscore(&self, player_id: u32) -> Result<PlayerHighscore> {
        let entry = self.store.get_entry(player_id)?;
        Ok(PlayerHighscore {
            rank: self.rank_of(entry.best_score)?,
            display_name: entry.display_name,
            best_score: entry.best_score,
        })
    }

    /// A player's matches in submission order, `limit` at a time
    pub fn match_history(
        &self,
        player_id: u32,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MatchRecord>> {
        self.store.get_entry(player_id)?;
        self.log.list_by_player_range(player_id, offset, limit)
    }

    fn rank_of(&self, best_score: u64) -> Result<u64> {
        Ok(1 + self.store.count_above(best_score)? as u64)
    }
}
