//! Player registration and lookup
//!
//! This module owns the roster of registered players, including:
//! - Player id allocation in registration order
//! - Unique, validated display names
//! - Creating each player's highscore entry in the same step as the player
//!
//! A player is only added to the roster once its highscore entry exists,
//! so every known player always has exactly one entry.

use crate::engine::HighscoreEngine;
use crate::error::{HighscoreError, Result};
use log::info;
use shared::{validate_display_name, Player};
use std::collections::HashMap;

/// Registered players indexed by id and by name
///
/// The registry hands out sequential ids starting at 1. It is not
/// internally synchronized; the service keeps it behind a mutex so that
/// a name check, id allocation and entry creation happen as one step.
pub struct PlayerRegistry {
    /// Registered players keyed by their id
    players: HashMap<u32, Player>,
    /// Name to id, for duplicate detection and lookups
    by_name: HashMap<String, u32>,
    /// Id handed to the next successful registration
    next_player_id: u32,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            by_name: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Registers a new player and opens their highscore entry
    ///
    /// The name is trimmed and validated first. If the engine refuses to
    /// create the entry the player is not registered and the id is not
    /// consumed.
    pub fn register(&mut self, engine: &HighscoreEngine, name: &str) -> Result<Player> {
        let name = validate_display_name(name)?;
        if self.find_by_name(name).is_some() {
            return Err(HighscoreError::NameTaken(name.to_string()));
        }

        let player = Player::new(self.next_player_id, name);
        engine.open_entry(player.id, &player.name)?;
        self.next_player_id += 1;

        info!("Player {} registered as {:?}", player.id, player.name);
        self.by_name.insert(player.name.clone(), player.id);
        self.players.insert(player.id, player.clone());

        Ok(player)
    }

    pub fn get(&self, player_id: u32) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// Looks a player up by display name, ignoring surrounding whitespace
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        self.by_name
            .get(name.trim())
            .and_then(|id| self.players.get(id))
    }

    /// Returns the number of registered players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
