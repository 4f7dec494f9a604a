//! Host and peer synchronization.
//!
//! Both sides are plain state machines: feed them connection events and
//! incoming [`WireMessage`]s, and they return the messages to send back.
//! Nothing here touches a socket, so every exchange can be replayed in a
//! test. The async driver lives in [`crate::client`].
//!
//! The host owns the match. It clears the board on the first `ready`,
//! resolves every move, decides turns and wins, and answers each move with
//! a full `gameState` (or `gameOver`). The peer applies moves optimistically
//! for display and then overwrites its board with whatever the host sends.

use crate::error::NetError;
use crate::protocol::WireMessage;
use crate::session::{ConnectionState, MultiplayerSession};
use dotmination_core::{GameError, GameMode, GameState, Player};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What the player should be told about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Connected, handshake not finished
    WaitingForPeer,
    Playing,
    GameOver { winner: Player },
    /// Host lost its peer and is listening for it again
    WaitingToReconnect,
    /// Peer lost the host and is trying to resume
    Reconnecting,
    /// Session ended on purpose by either side
    Closed,
}

impl SyncStatus {
    /// Status line for the player
    pub fn message(&self) -> &'static str {
        match self {
            SyncStatus::WaitingForPeer => "Waiting for the other player",
            SyncStatus::Playing => "Connected",
            SyncStatus::GameOver { .. } => "Game over",
            SyncStatus::WaitingToReconnect => "Waiting to reconnect",
            SyncStatus::Reconnecting => "Reconnecting",
            SyncStatus::Closed => "Disconnected",
        }
    }
}

/// Why the link went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The other side sent `modeSwitch` or this side abandoned the session
    ModeSwitch,
    /// The transport failed
    Dropped,
}

/// Behavior shared by both sides of a session
pub trait SyncRole {
    fn session(&self) -> &MultiplayerSession;

    fn game(&self) -> &GameState;

    fn status(&self) -> SyncStatus;

    /// The link is open; returns the opening messages
    fn on_open(&mut self) -> Vec<WireMessage>;

    /// Handle one message from the other side
    fn on_message(&mut self, msg: WireMessage) -> Result<Vec<WireMessage>, NetError>;

    /// The local player clicked a cell
    fn local_move(&mut self, index: usize) -> Result<Vec<WireMessage>, NetError>;

    /// The local player asked for another match
    fn request_rematch(&mut self) -> Vec<WireMessage>;

    /// The link closed
    fn on_close(&mut self, reason: CloseReason);

    /// Leave the session for good
    fn abandon(&mut self) -> Vec<WireMessage> {
        self.on_close(CloseReason::ModeSwitch);
        vec![WireMessage::ModeSwitch]
    }
}

/// Authoritative side of a networked match (plays P1)
#[derive(Debug, Clone)]
pub struct HostSync {
    session: MultiplayerSession,
    game: GameState,
    /// Set once the opening `gameState` went out on the current link
    has_sent_game_state: bool,
    /// Keep the board at the next handshake instead of clearing it
    resume: bool,
    status: SyncStatus,
}

impl HostSync {
    pub fn new(mut session: MultiplayerSession, rows: usize, cols: usize) -> Result<Self, NetError> {
        let mut game = GameState::new(GameMode::Multiplayer, rows, cols)?;
        game.reset_match(session.start_type, session.match_starter);
        session.connection_state = ConnectionState::Connecting;
        Ok(Self {
            session,
            game,
            has_sent_game_state: false,
            resume: false,
            status: SyncStatus::WaitingForPeer,
        })
    }

    pub fn has_sent_game_state(&self) -> bool {
        self.has_sent_game_state
    }

    /// `gameOver` once the match has ended, `gameState` otherwise
    fn state_message(&self) -> WireMessage {
        match self.game.winner() {
            Some(winner) => WireMessage::GameOver {
                winner,
                map_string: self.game.board.encode(),
            },
            None => WireMessage::game_state(&self.game, self.session.start_type),
        }
    }

    fn after_move(&mut self) -> WireMessage {
        if let Some(winner) = self.game.winner() {
            info!("Match over, {} wins after {} moves", winner, self.game.move_count);
            self.status = SyncStatus::GameOver { winner };
        }
        self.state_message()
    }

    fn try_rematch(&mut self) -> Vec<WireMessage> {
        if !self.session.rematch_agreed() {
            return Vec::new();
        }
        let starter = self.session.match_starter.opponent();
        info!("Starting rematch, {} moves first", starter);
        self.session.match_starter = starter;
        self.session.reset_rematch();
        self.game.reset_match(self.session.start_type, starter);
        self.status = SyncStatus::Playing;
        vec![self.state_message()]
    }
}

impl SyncRole for HostSync {
    fn session(&self) -> &MultiplayerSession {
        &self.session
    }

    fn game(&self) -> &GameState {
        &self.game
    }

    fn status(&self) -> SyncStatus {
        self.status
    }

    fn on_open(&mut self) -> Vec<WireMessage> {
        self.session.connection_state = ConnectionState::Connected;
        self.has_sent_game_state = false;
        self.status = SyncStatus::WaitingForPeer;
        Vec::new()
    }

    fn on_message(&mut self, msg: WireMessage) -> Result<Vec<WireMessage>, NetError> {
        match msg {
            WireMessage::Ready => {
                if self.has_sent_game_state {
                    debug!("Ignoring ready, game state already sent");
                    return Ok(Vec::new());
                }
                if self.resume {
                    info!("Peer reconnected, resuming at move {}", self.game.move_count);
                } else {
                    self.game
                        .reset_match(self.session.start_type, self.session.match_starter);
                }
                self.resume = false;
                self.has_sent_game_state = true;
                self.status = match self.game.winner() {
                    Some(winner) => SyncStatus::GameOver { winner },
                    None => SyncStatus::Playing,
                };
                Ok(vec![self.state_message()])
            }
            WireMessage::Move { dot_index } => {
                if !self.has_sent_game_state {
                    return Err(NetError::Protocol("move before game state".into()));
                }
                match self.game.apply_move(Player::P2, dot_index) {
                    Ok(_) => Ok(vec![self.after_move()]),
                    Err(e) => {
                        warn!("Dropping relayed move {}: {}", dot_index, e);
                        Ok(vec![self.state_message()])
                    }
                }
            }
            WireMessage::RematchReady => {
                self.session.rematch_ready_remote = true;
                Ok(self.try_rematch())
            }
            WireMessage::ModeSwitch => {
                self.on_close(CloseReason::ModeSwitch);
                Ok(Vec::new())
            }
            other @ (WireMessage::GameState { .. } | WireMessage::GameOver { .. }) => Err(NetError::Protocol(
                format!("host received {}", other.kind()),
            )),
        }
    }

    fn local_move(&mut self, index: usize) -> Result<Vec<WireMessage>, NetError> {
        if !self.session.is_connected() || !self.has_sent_game_state {
            return Err(NetError::Connection("no peer connected".into()));
        }
        self.game.apply_move(Player::P1, index)?;
        Ok(vec![WireMessage::Move { dot_index: index }, self.after_move()])
    }

    fn request_rematch(&mut self) -> Vec<WireMessage> {
        self.session.rematch_ready_local = true;
        let mut out = vec![WireMessage::RematchReady];
        out.extend(self.try_rematch());
        out
    }

    fn on_close(&mut self, reason: CloseReason) {
        self.session.connection_state = ConnectionState::Disconnected;
        self.session.reset_rematch();
        self.has_sent_game_state = false;
        match reason {
            CloseReason::ModeSwitch => {
                info!("Session closed");
                self.status = SyncStatus::Closed;
            }
            CloseReason::Dropped => {
                warn!("Peer dropped, waiting to reconnect");
                self.resume = true;
                self.status = SyncStatus::WaitingToReconnect;
            }
        }
    }
}

/// Following side of a networked match (plays P2)
#[derive(Debug, Clone)]
pub struct PeerSync {
    session: MultiplayerSession,
    game: GameState,
    /// Set once the confirming `ready` went out on the current link
    confirmed: bool,
    /// A local move was sent and the host has not answered yet
    awaiting_snapshot: bool,
    status: SyncStatus,
}

impl PeerSync {
    pub fn new(mut session: MultiplayerSession, rows: usize, cols: usize) -> Result<Self, NetError> {
        let game = GameState::new(GameMode::Multiplayer, rows, cols)?;
        session.connection_state = ConnectionState::Connecting;
        Ok(Self {
            session,
            game,
            confirmed: false,
            awaiting_snapshot: false,
            status: SyncStatus::WaitingForPeer,
        })
    }

    fn check_rematch(&mut self) {
        if self.session.rematch_agreed() {
            debug!("Rematch agreed, waiting for new game state");
            self.session.reset_rematch();
        }
    }
}

impl SyncRole for PeerSync {
    fn session(&self) -> &MultiplayerSession {
        &self.session
    }

    fn game(&self) -> &GameState {
        &self.game
    }

    fn status(&self) -> SyncStatus {
        self.status
    }

    fn on_open(&mut self) -> Vec<WireMessage> {
        self.session.connection_state = ConnectionState::Connected;
        self.confirmed = false;
        self.awaiting_snapshot = false;
        self.status = SyncStatus::WaitingForPeer;
        vec![WireMessage::Ready]
    }

    fn on_message(&mut self, msg: WireMessage) -> Result<Vec<WireMessage>, NetError> {
        match msg {
            WireMessage::GameState {
                start_type,
                match_starter,
                ..
            } => {
                let snapshot = msg
                    .snapshot()
                    .ok_or_else(|| NetError::Protocol("gameState without snapshot".into()))?;
                self.game.apply_snapshot(&snapshot)?;
                self.session.start_type = start_type;
                self.session.match_starter = match_starter;
                self.awaiting_snapshot = false;
                self.status = SyncStatus::Playing;
                self.check_rematch();

                if self.confirmed {
                    return Ok(Vec::new());
                }
                self.confirmed = true;
                Ok(vec![WireMessage::Ready])
            }
            WireMessage::Move { dot_index } => {
                // Display only; the next gameState is what counts
                if let Err(e) = self.game.board.apply_move(dot_index, Player::P1) {
                    debug!("Optimistic apply of host move {} failed: {}", dot_index, e);
                }
                Ok(Vec::new())
            }
            WireMessage::GameOver { winner, map_string } => {
                self.game.apply_game_over(winner, &map_string)?;
                self.awaiting_snapshot = false;
                self.status = SyncStatus::GameOver { winner };
                Ok(Vec::new())
            }
            WireMessage::RematchReady => {
                self.session.rematch_ready_remote = true;
                self.check_rematch();
                Ok(Vec::new())
            }
            WireMessage::ModeSwitch => {
                self.on_close(CloseReason::ModeSwitch);
                Ok(Vec::new())
            }
            WireMessage::Ready => Err(NetError::Protocol("peer received ready".into())),
        }
    }

    fn local_move(&mut self, index: usize) -> Result<Vec<WireMessage>, NetError> {
        match self.status {
            SyncStatus::Playing => {}
            SyncStatus::GameOver { .. } => return Err(GameError::GameOver.into()),
            _ => return Err(NetError::Connection("not connected to a host".into())),
        }
        if self.awaiting_snapshot || self.game.current_player != Player::P2 {
            return Err(GameError::NotYourTurn.into());
        }
        self.game.board.apply_move(index, Player::P2)?;
        self.awaiting_snapshot = true;
        Ok(vec![WireMessage::Move { dot_index: index }])
    }

    fn request_rematch(&mut self) -> Vec<WireMessage> {
        self.session.rematch_ready_local = true;
        self.check_rematch();
        vec![WireMessage::RematchReady]
    }

    fn on_close(&mut self, reason: CloseReason) {
        self.session.connection_state = ConnectionState::Disconnected;
        self.session.reset_rematch();
        self.confirmed = false;
        self.awaiting_snapshot = false;
        self.status = match reason {
            CloseReason::ModeSwitch => SyncStatus::Closed,
            CloseReason::Dropped => SyncStatus::Reconnecting,
        };
    }
}
