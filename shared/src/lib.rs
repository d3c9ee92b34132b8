use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 100;
pub const MAX_NAME_LEN: usize = 30;
pub const MAX_PACKET_SIZE: usize = 16 * 1024;

/// Every datagram exchanged between client and server.
///
/// Requests carry a client-chosen `request_id` which the server echoes in
/// the matching response so the client can pair them up over UDP.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Hello {
        request_id: u32,
        client_version: u32,
    },
    Register {
        request_id: u32,
        username: String,
    },
    SubmitMatch {
        request_id: u32,
        player_id: u32,
        score: i64,
    },
    GetHighscore {
        request_id: u32,
        player_id: u32,
    },
    GetLeaderboardSummary {
        request_id: u32,
    },
    GetLeaderboardPage {
        request_id: u32,
        page_index: u32,
    },
    GetMatchHistory {
        request_id: u32,
        player_id: u32,
        offset: u32,
        limit: u32,
    },
    GetPlayer {
        request_id: u32,
        player_id: u32,
    },

    Welcome {
        request_id: u32,
        server_version: u32,
        page_size: u32,
    },
    Registered {
        request_id: u32,
        player: Player,
    },
    MatchAccepted {
        request_id: u32,
        accepted: bool,
        current_best_score: u64,
        new_best: bool,
    },
    Highscore {
        request_id: u32,
        highscore: PlayerHighscore,
    },
    LeaderboardSummary {
        request_id: u32,
        summary: LeaderboardSummary,
    },
    LeaderboardPage {
        request_id: u32,
        page_index: u32,
        rows: Vec<LeaderboardRow>,
    },
    MatchHistory {
        request_id: u32,
        matches: Vec<MatchRecord>,
    },
    PlayerInfo {
        request_id: u32,
        player: Player,
    },
    Error {
        request_id: u32,
        kind: ErrorKind,
        message: String,
    },
}

impl Packet {
    pub fn request_id(&self) -> u32 {
        match self {
            Packet::Hello { request_id, .. }
            | Packet::Register { request_id, .. }
            | Packet::SubmitMatch { request_id, .. }
            | Packet::GetHighscore { request_id, .. }
            | Packet::GetLeaderboardSummary { request_id }
            | Packet::GetLeaderboardPage { request_id, .. }
            | Packet::GetMatchHistory { request_id, .. }
            | Packet::GetPlayer { request_id, .. }
            | Packet::Welcome { request_id, .. }
            | Packet::Registered { request_id, .. }
            | Packet::MatchAccepted { request_id, .. }
            | Packet::Highscore { request_id, .. }
            | Packet::LeaderboardSummary { request_id, .. }
            | Packet::LeaderboardPage { request_id, .. }
            | Packet::MatchHistory { request_id, .. }
            | Packet::PlayerInfo { request_id, .. }
            | Packet::Error { request_id, .. } => *request_id,
        }
    }
}

/// Error categories reported on the wire
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Storage,
    Malformed,
    UnsupportedVersion,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub registered_at: DateTime<Utc>,
}

impl Player {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            registered_at: Utc::now(),
        }
    }
}

/// One recorded match. Never mutated once logged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: u64,
    pub player_id: u32,
    pub score: u64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerHighscore {
    pub display_name: String,
    pub best_score: u64,
    pub rank: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaderboardSummary {
    pub count: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub display_name: String,
    pub score: u64,
}

/// Number of pages needed to show `count` rows, `page_size` at a time.
pub fn page_count(count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size as u64)
}

/// Why a display name was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,

    #[error("name is longer than {} characters", MAX_NAME_LEN)]
    TooLong,

    #[error("name contains control characters")]
    ControlCharacters,
}

/// Checks a display name against the registration rules.
///
/// Names are compared after trimming surrounding whitespace, must hold
/// between 1 and `MAX_NAME_LEN` characters and may not contain control
/// characters.
pub fn validate_display_name(name: &str) -> Result<&str, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if trimmed.chars().any(char::is_control) {
        return Err(NameError::ControlCharacters);
    }
    Ok(trimmed)
}
