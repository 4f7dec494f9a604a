//! Wire protocol messages.
//!
//! Two layers travel as JSON text:
//! - [`WireMessage`]: the game protocol spoken between host and peer
//! - [`RelayRequest`] / [`RelayEvent`]: the broker protocol spoken with the
//!   relay server, which carries game messages inside `data` frames

use dotmination_core::{GameState, Player, Snapshot, StartType};
use serde::{Deserialize, Serialize};

/// Messages exchanged between host and peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireMessage {
    /// Peer is connected, or has applied the first game state
    Ready,

    /// Authoritative board and turn
    GameState {
        current_player: Player,
        move_count: u32,
        map_string: String,
        start_type: StartType,
        match_starter: Player,
    },

    /// A click on a cell
    Move { dot_index: usize },

    /// Final board and result
    GameOver { winner: Player, map_string: String },

    /// Sender wants another match
    RematchReady,

    /// Sender is leaving the session
    ModeSwitch,
}

impl WireMessage {
    /// Full-state message for the current game
    pub fn game_state(game: &GameState, start_type: StartType) -> Self {
        let Snapshot {
            current_player,
            move_count,
            map_string,
            match_starter,
        } = game.snapshot();
        WireMessage::GameState {
            current_player,
            move_count,
            map_string,
            start_type,
            match_starter,
        }
    }

    /// The snapshot carried by a `gameState` message
    pub fn snapshot(&self) -> Option<Snapshot> {
        match self {
            WireMessage::GameState {
                current_player,
                move_count,
                map_string,
                match_starter,
                ..
            } => Some(Snapshot {
                current_player: *current_player,
                move_count: *move_count,
                map_string: map_string.clone(),
                match_starter: *match_starter,
            }),
            _ => None,
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Ready => "ready",
            WireMessage::GameState { .. } => "gameState",
            WireMessage::Move { .. } => "move",
            WireMessage::GameOver { .. } => "gameOver",
            WireMessage::RematchReady => "rematchReady",
            WireMessage::ModeSwitch => "modeSwitch",
        }
    }
}

/// Messages sent from a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayRequest {
    /// Claim an identifier for this connection
    Register { id: String },

    /// Ask whether an identifier is registered
    Lookup { id: String },

    /// Open a link to the connection registered as `target`
    Connect { target: String },

    /// Forward a payload over the open link
    Data { payload: serde_json::Value },
}

/// Messages sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayEvent {
    /// Identifier claimed
    Registered { id: String },

    /// Answer to a lookup
    LookupResult { id: String, exists: bool },

    /// A link is open; `remote` names the other end
    Connected { remote: String },

    /// Payload forwarded from the other end of the link
    Data { payload: serde_json::Value },

    /// The other end of the link went away
    PeerClosed,

    /// Request failed
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_game_state_wire_format() {
        let msg: WireMessage = serde_json::from_value(json!({
            "type": "gameState",
            "currentPlayer": "P1",
            "moveCount": 0,
            "mapString": "0".repeat(40),
            "startType": "blank",
            "matchStarter": "P1",
        }))
        .unwrap();

        assert_eq!(
            msg,
            WireMessage::GameState {
                current_player: Player::P1,
                move_count: 0,
                map_string: "0".repeat(40),
                start_type: StartType::Blank,
                match_starter: Player::P1,
            }
        );
    }

    #[test]
    fn test_payload_free_messages() {
        assert_eq!(serde_json::to_value(WireMessage::Ready).unwrap(), json!({"type": "ready"}));
        assert_eq!(
            serde_json::to_value(WireMessage::RematchReady).unwrap(),
            json!({"type": "rematchReady"})
        );
        assert_eq!(
            serde_json::to_value(WireMessage::ModeSwitch).unwrap(),
            json!({"type": "modeSwitch"})
        );
    }

    #[test]
    fn test_move_and_game_over_fields() {
        assert_eq!(
            serde_json::to_value(WireMessage::Move { dot_index: 12 }).unwrap(),
            json!({"type": "move", "dotIndex": 12})
        );
        let over: WireMessage = serde_json::from_str(
            r#"{"type":"gameOver","winner":"P2","mapString":"0066"}"#,
        )
        .unwrap();
        assert_eq!(
            over,
            WireMessage::GameOver {
                winner: Player::P2,
                map_string: "0066".into()
            }
        );
    }

    #[test]
    fn test_half_filled_start_type() {
        let msg = WireMessage::GameState {
            current_player: Player::P2,
            move_count: 3,
            map_string: "1166".into(),
            start_type: StartType::HalfFilled,
            match_starter: Player::P2,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["startType"], "half-filled");
        assert_eq!(msg.kind(), "gameState");
        assert_eq!(msg.snapshot().map(|s| s.move_count), Some(3));
    }

    #[test]
    fn test_relay_frames() {
        let req = RelayRequest::Data {
            payload: serde_json::to_value(WireMessage::Ready).unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"type": "data", "payload": {"type": "ready"}})
        );

        let event: RelayEvent =
            serde_json::from_str(r#"{"type":"lookupResult","id":"dotmination-blank-host-1","exists":true}"#)
                .unwrap();
        assert_eq!(
            event,
            RelayEvent::LookupResult {
                id: "dotmination-blank-host-1".into(),
                exists: true
            }
        );
    }
}
