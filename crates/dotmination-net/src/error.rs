//! Error types for the networking layer.

use dotmination_core::{FormatError, GameError};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("No lobby slot available")]
    SlotExhausted,

    #[error("Invalid map string: {0}")]
    Format(#[from] FormatError),

    #[error("Move rejected: {0}")]
    Game(#[from] GameError),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<tungstenite::Error> for NetError {
    fn from(err: tungstenite::Error) -> Self {
        NetError::Connection(err.to_string())
    }
}

impl NetError {
    /// Plain-language text for the player. Never includes internal detail.
    pub fn status_message(&self) -> &'static str {
        match self {
            NetError::Connection(_) => "Connection lost",
            NetError::SlotExhausted => "No games available",
            NetError::Format(_) | NetError::Protocol(_) | NetError::Serialization(_) => {
                "Out of sync with the other player"
            }
            NetError::Game(GameError::BoardBusy) => "Wait for the board to settle",
            NetError::Game(GameError::NotYourTurn) => "Not your turn",
            NetError::Game(GameError::GameOver) => "The game is over",
            NetError::Game(_) => "That move is not allowed",
            NetError::Storage(_) => "Could not save the session",
        }
    }

    /// Whether the reconnection flow should handle this error
    pub fn is_connection(&self) -> bool {
        matches!(self, NetError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_hide_details() {
        let err = NetError::Protocol("unexpected ready from host at move 12".into());
        assert_eq!(err.status_message(), "Out of sync with the other player");
        assert!(!err.status_message().contains("12"));

        assert_eq!(NetError::SlotExhausted.status_message(), "No games available");
        assert_eq!(
            NetError::from(GameError::IllegalMove(3)).status_message(),
            "That move is not allowed"
        );
    }

    #[test]
    fn test_only_connection_errors_reconnect() {
        assert!(NetError::Connection("reset".into()).is_connection());
        assert!(!NetError::SlotExhausted.is_connection());
    }
}
