//! Request-facing operations of the highscore server

use crate::engine::{HighscoreEngine, SubmitOutcome};
use crate::error::{HighscoreError, Result};
use crate::leaderboard::LeaderboardQuery;
use crate::match_log::{MatchLog, MemoryMatchLog};
use crate::registry::PlayerRegistry;
use crate::score_store::{MemoryScoreStore, ScoreStore};
use shared::{
    LeaderboardRow, LeaderboardSummary, MatchRecord, Player, PlayerHighscore, MAX_HISTORY_LIMIT,
};
use std::sync::{Arc, Mutex};

/// Counters reported by the periodic stats task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    pub players: usize,
    pub ranked_players: u64,
    pub matches: usize,
}

/// Wires registration, the engine and the leaderboard together.
///
/// The registry mutex only serializes registrations; submissions and
/// reads go straight to the engine and leaderboard.
pub struct HighscoreService {
    registry: Mutex<PlayerRegistry>,
    engine: HighscoreEngine,
    leaderboard: LeaderboardQuery,
}

impl HighscoreService {
    /// Service backed by the in-memory stores
    pub fn new(page_size: u32) -> Self {
        Self::with_stores(
            Arc::new(MemoryScoreStore::new()),
            Arc::new(MemoryMatchLog::new()),
            page_size,
        )
    }

    pub fn with_stores(
        store: Arc<dyn ScoreStore>,
        log: Arc<dyn MatchLog>,
        page_size: u32,
    ) -> Self {
        Self {
            registry: Mutex::new(PlayerRegistry::new()),
            engine: HighscoreEngine::new(Arc::clone(&store), log),
            leaderboard: LeaderboardQuery::new(store, page_size),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.leaderboard.page_size()
    }

    pub fn engine(&self) -> &HighscoreEngine {
        &self.engine
    }

    pub fn register(&self, name: &str) -> Result<Player> {
        let mut registry = self.registry.lock()?;
        registry.register(&self.engine, name)
    }

    pub fn player(&self, player_id: u32) -> Result<Player> {
        let registry = self.registry.lock()?;
        registry
            .get(player_id)
            .cloned()
            .ok_or(HighscoreError::NotFound(player_id))
    }

    pub fn submit(&self, player_id: u32, score: i64) -> Result<SubmitOutcome> {
        self.engine.submit_match(player_id, score)
    }

    pub fn my_highscore(&self, player_id: u32) -> Result<PlayerHighscore> {
        self.engine.player_highscore(player_id)
    }

    pub fn leaderboard_summary(&self) -> Result<LeaderboardSummary> {
        self.leaderboard.summary()
    }

    pub fn leaderboard_page(&self, page_index: u32) -> Result<Vec<LeaderboardRow>> {
        self.leaderboard.get_page(page_index)
    }

    /// A window of the player's match history; `limit` is capped at
    /// `MAX_HISTORY_LIMIT` so a response fits in one datagram.
    pub fn match_history(
        &self,
        player_id: u32,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<MatchRecord>> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        self.engine
            .match_history(player_id, offset as usize, limit as usize)
    }

    pub fn stats(&self) -> Result<ServiceStats> {
        let players = self.registry.lock()?.len();
        Ok(ServiceStats {
            players,
            ranked_players: self.leaderboard.get_count()?,
            matches: self.engine.match_log().len()?,
        })
    }
}
