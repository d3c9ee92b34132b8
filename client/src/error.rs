use shared::{ErrorKind, Packet};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("No response from server within {0:?}")]
    Timeout(Duration),

    #[error("Server rejected request ({kind:?}): {message}")]
    Server { kind: ErrorKind, message: String },

    #[error("Expected {expected} but server sent {received}")]
    UnexpectedResponse {
        expected: &'static str,
        received: String,
    },
}

impl ClientError {
    pub(crate) fn unexpected(expected: &'static str, packet: &Packet) -> Self {
        ClientError::UnexpectedResponse {
            expected,
            received: format!("{:?}", packet),
        }
    }

    /// Kind reported by the server, if the server rejected the request
    pub fn server_kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
