use shared::{ErrorKind, NameError};
use std::sync::PoisonError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HighscoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HighscoreError {
    #[error("no highscore entry for player {0}")]
    NotFound(u32),

    #[error("highscore entry for player {0} already exists")]
    DuplicateEntry(u32),

    #[error("name {0:?} is already registered")]
    NameTaken(String),

    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("invalid score {0}: scores must not be negative")]
    InvalidScore(i64),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl HighscoreError {
    /// Category reported to clients for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HighscoreError::NotFound(_) => ErrorKind::NotFound,
            HighscoreError::DuplicateEntry(_) | HighscoreError::NameTaken(_) => ErrorKind::Conflict,
            HighscoreError::InvalidName(_) | HighscoreError::InvalidScore(_) => {
                ErrorKind::InvalidInput
            }
            HighscoreError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl<T> From<PoisonError<T>> for HighscoreError {
    fn from(err: PoisonError<T>) -> Self {
        HighscoreError::Storage(format!("lock poisoned: {}", err))
    }
}
