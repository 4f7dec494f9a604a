//! Core game state machine.
//!
//! This module contains the main `GameState` struct: turn order, move
//! counting, win detection and match progression for every mode.

use crate::actions::{GameAction, GameEvent};
use crate::board::{Board, FormatError, StartType};
use crate::chain::Resolution;
use crate::player::Player;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Moves that must resolve before a wiped-out player loses
const MIN_MOVES_FOR_WIN: u32 = 2;

/// How a match is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Solo against a bot through a fixed ladder of levels
    Regular,
    /// Solo against a bot on a freshly generated map each match
    Random,
    /// Two players over the network, the host holding the authoritative state
    Multiplayer,
    /// Both players act at once on a shared board, gated by resources
    RealTime,
}

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Waiting for a click. In real-time play either player may act.
    AwaitingMove(Player),
    /// A chain started by this player is still being processed
    Resolving(Player),
    /// Match is over
    Terminal { winner: Player },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Cell {0} belongs to the other player")]
    IllegalMove(usize),

    #[error("A chain reaction is still resolving")]
    BoardBusy,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Game is over")]
    GameOver,

    #[error("There is no cell {0}")]
    OutOfRange(usize),

    #[error("Still cooling down")]
    OnCooldown,

    #[error("No resources left")]
    NoResources,

    #[error("Not available in this mode")]
    WrongMode,

    #[error("Match is still in progress")]
    MatchInProgress,

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Authoritative turn view sent to followers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub current_player: Player,
    pub move_count: u32,
    pub map_string: String,
    pub match_starter: Player,
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// How this match is played
    pub mode: GameMode,
    /// The game board
    pub board: Board,
    /// Whose turn it is (last actor in real-time play)
    pub current_player: Player,
    /// Current phase
    pub phase: MatchPhase,
    /// Moves resolved this match
    pub move_count: u32,
    /// Who moved first this match
    pub match_starter: Player,
    /// Regular-mode level (1-based)
    pub level: u32,
    /// Set once both players have held a cell, for real-time win detection
    both_claimed: bool,
}

impl GameState {
    /// Create a new game for a mode on a board of the given size
    pub fn new(mode: GameMode, rows: usize, cols: usize) -> Result<Self, GameError> {
        let board = match mode {
            GameMode::Regular => Board::for_level(rows, cols, 1)?,
            GameMode::Random => Board::random(rows, cols, &mut rand::thread_rng())?,
            GameMode::Multiplayer | GameMode::RealTime => Board::new(rows, cols)?,
        };
        Ok(Self::with_board(mode, board))
    }

    /// Create a game on an existing board, P1 to move
    pub fn with_board(mode: GameMode, board: Board) -> Self {
        let mut game = Self {
            mode,
            board,
            current_player: Player::P1,
            phase: MatchPhase::AwaitingMove(Player::P1),
            move_count: 0,
            match_starter: Player::P1,
            level: 1,
            both_claimed: false,
        };
        game.update_claims();
        game
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, MatchPhase::Terminal { .. })
    }

    /// Get the winner if the game is finished
    pub fn winner(&self) -> Option<Player> {
        match self.phase {
            MatchPhase::Terminal { winner } => Some(winner),
            _ => None,
        }
    }

    /// Cells `player` may click right now
    pub fn valid_moves(&self, player: Player) -> Vec<usize> {
        match self.phase {
            MatchPhase::AwaitingMove(current)
                if current == player || self.mode == GameMode::RealTime =>
            {
                self.board.legal_moves(player)
            }
            _ => Vec::new(),
        }
    }

    /// Apply an action, returning the resulting events
    pub fn apply_action(
        &mut self,
        player: Player,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Move(index) => self.apply_move(player, index).map(|r| r.events),
            GameAction::NextMatch => self.next_match().map(|event| vec![event]),
        }
    }

    /// Apply a move and resolve it completely.
    ///
    /// The returned events end with either `TurnPassed` or `GameWon`.
    pub fn apply_move(&mut self, player: Player, index: usize) -> Result<Resolution, GameError> {
        let first = self.begin_move(player, index)?;
        let mut events = vec![first];
        while let Some(event) = self.step() {
            events.push(event);
        }

        let exploded = events.iter().any(GameEvent::is_explosion);
        Ok(Resolution { events, exploded })
    }

    /// Start a move without draining its chain.
    ///
    /// Call `step` until it returns `None` to finish the move; the turn
    /// advances once the chain is empty.
    pub fn begin_move(&mut self, player: Player, index: usize) -> Result<GameEvent, GameError> {
        if self.mode == GameMode::RealTime {
            return Err(GameError::WrongMode);
        }
        match self.phase {
            MatchPhase::Terminal { .. } => return Err(GameError::GameOver),
            MatchPhase::Resolving(_) => return Err(GameError::BoardBusy),
            MatchPhase::AwaitingMove(current) if current != player => {
                return Err(GameError::NotYourTurn)
            }
            MatchPhase::AwaitingMove(_) => {}
        }
        self.start_resolution(player, index)
    }

    /// Shared by turn-based and real-time play: lock the board and apply the first increment
    pub(crate) fn start_resolution(
        &mut self,
        player: Player,
        index: usize,
    ) -> Result<GameEvent, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        let event = self.board.begin_move(index, player)?;
        self.phase = MatchPhase::Resolving(player);
        Ok(event)
    }

    /// Process one step of the move in flight.
    ///
    /// Returns the turn outcome event after the last chain step, then `None`.
    pub fn step(&mut self) -> Option<GameEvent> {
        let MatchPhase::Resolving(player) = self.phase else {
            return None;
        };
        if let Some(event) = self.board.step_chain() {
            return Some(event);
        }
        Some(self.complete_move(player))
    }

    /// Evaluate the board after a chain has settled
    fn complete_move(&mut self, player: Player) -> GameEvent {
        // Turn-based play checks the count of earlier moves, then counts this one
        let winner = match self.mode {
            GameMode::RealTime => {
                self.move_count += 1;
                self.update_claims();
                if self.both_claimed {
                    self.sole_survivor()
                } else {
                    None
                }
            }
            _ if self.move_count >= MIN_MOVES_FOR_WIN => self.sole_survivor(),
            _ => None,
        };

        match winner {
            Some(winner) => {
                self.phase = MatchPhase::Terminal { winner };
                GameEvent::GameWon {
                    player: winner,
                    move_count: self.move_count,
                }
            }
            None => {
                let next_player = match self.mode {
                    GameMode::RealTime => player,
                    _ => {
                        self.move_count += 1;
                        player.opponent()
                    }
                };
                self.current_player = next_player;
                self.phase = MatchPhase::AwaitingMove(next_player);
                GameEvent::TurnPassed {
                    player,
                    next_player,
                    move_count: self.move_count,
                }
            }
        }
    }

    /// The only player still on the board, if exactly one is
    fn sole_survivor(&self) -> Option<Player> {
        let p1 = self.board.piece_count(Player::P1);
        let p2 = self.board.piece_count(Player::P2);
        match (p1, p2) {
            (0, 0) => None,
            (_, 0) => Some(Player::P1),
            (0, _) => Some(Player::P2),
            _ => None,
        }
    }

    fn update_claims(&mut self) {
        if Player::ALL.iter().all(|&p| self.board.piece_count(p) > 0) {
            self.both_claimed = true;
        }
    }

    /// Start the next match once this one is over
    pub fn next_match(&mut self) -> Result<GameEvent, GameError> {
        let winner = self.winner().ok_or(GameError::MatchInProgress)?;
        let (rows, cols) = (self.board.rows(), self.board.cols());

        match self.mode {
            GameMode::Regular => {
                // Beating a level moves the ladder on, losing retries it
                if winner == Player::P1 {
                    self.level += 1;
                }
                self.board = Board::for_level(rows, cols, self.level)?;
            }
            GameMode::Random => {
                self.board = Board::random(rows, cols, &mut rand::thread_rng())?;
            }
            GameMode::Multiplayer => {
                let starter = self.match_starter.opponent();
                self.reset_match(StartType::Blank, starter);
                return Ok(GameEvent::MatchStarted {
                    starter,
                    level: self.level,
                });
            }
            GameMode::RealTime => self.board.clear(StartType::Blank),
        }

        let starter = self.match_starter;
        self.restart(starter);
        Ok(GameEvent::MatchStarted {
            starter,
            level: self.level,
        })
    }

    /// Clear the board for a fresh multiplayer match
    pub fn reset_match(&mut self, start: StartType, starter: Player) {
        self.board.clear(start);
        self.restart(starter);
    }

    fn restart(&mut self, starter: Player) {
        self.match_starter = starter;
        self.current_player = starter;
        self.move_count = 0;
        self.phase = MatchPhase::AwaitingMove(starter);
        self.both_claimed = false;
        self.update_claims();
    }

    /// Authoritative view of the turn and board
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_player: self.current_player,
            move_count: self.move_count,
            map_string: self.board.encode(),
            match_starter: self.match_starter,
        }
    }

    /// Install a snapshot received from the authoritative side.
    ///
    /// Nothing changes if the map string does not fit this board.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), GameError> {
        self.board.load_map_string(&snapshot.map_string)?;
        self.current_player = snapshot.current_player;
        self.move_count = snapshot.move_count;
        self.match_starter = snapshot.match_starter;
        self.phase = MatchPhase::AwaitingMove(snapshot.current_player);
        Ok(())
    }

    /// Install a final board and winner decided elsewhere
    pub fn apply_game_over(&mut self, winner: Player, map_string: &str) -> Result<(), GameError> {
        self.board.load_map_string(map_string)?;
        self.phase = MatchPhase::Terminal { winner };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn game_on(map: &str, rows: usize, cols: usize) -> GameState {
        GameState::with_board(GameMode::Multiplayer, Board::decode(rows, cols, map).unwrap())
    }

    #[test]
    fn test_new_game_awaits_first_player() {
        let game = GameState::new(GameMode::Multiplayer, 16, 3).unwrap();
        assert_eq!(game.phase, MatchPhase::AwaitingMove(Player::P1));
        assert_eq!(game.move_count, 0);
        assert_eq!(game.board.encode(), "0".repeat(40));
    }

    #[test]
    fn test_turns_alternate() {
        let mut game = GameState::new(GameMode::Multiplayer, 3, 3).unwrap();
        let resolution = game.apply_move(Player::P1, 0).unwrap();
        assert_eq!(
            resolution.events.last(),
            Some(&GameEvent::TurnPassed {
                player: Player::P1,
                next_player: Player::P2,
                move_count: 1
            })
        );
        assert_eq!(game.current_player, Player::P2);
        assert_eq!(game.apply_move(Player::P1, 1), Err(GameError::NotYourTurn));

        game.apply_move(Player::P2, 4).unwrap();
        assert_eq!(game.current_player, Player::P1);
        assert_eq!(game.move_count, 2);
    }

    #[test]
    fn test_rejected_move_keeps_turn() {
        let mut game = game_on("16000", 1, 5);
        assert_eq!(game.apply_move(Player::P1, 1), Err(GameError::IllegalMove(1)));
        assert_eq!(game.current_player, Player::P1);
        assert_eq!(game.move_count, 0);
    }

    #[test]
    fn test_no_win_before_two_moves() {
        // P1 can wipe P2 on the very first move, but the match goes on
        let mut game = game_on("56", 1, 2);
        game.apply_move(Player::P1, 0).unwrap();
        assert_eq!(game.board.piece_count(Player::P2), 0);
        assert!(!game.is_finished());
        assert_eq!(game.current_player, Player::P2);
        assert_eq!(game.move_count, 1);
    }

    #[test]
    fn test_no_win_on_second_move() {
        let mut game = GameState::with_board(GameMode::Random, Board::decode(1, 4, "00A1").unwrap());
        game.apply_move(Player::P1, 3).unwrap();
        game.apply_move(Player::P2, 2).unwrap();

        // The explosion took P1's only cell, but only one move had been counted
        assert_eq!(game.board.piece_count(Player::P1), 0);
        assert!(!game.is_finished());
        assert_eq!(game.move_count, 2);
        assert_eq!(game.current_player, Player::P1);
    }

    #[test]
    fn test_wiping_out_opponent_wins() {
        let mut game = game_on("5600", 1, 4);
        game.move_count = 2;

        let resolution = game.apply_move(Player::P1, 0).unwrap();
        assert_eq!(
            resolution.events.last(),
            Some(&GameEvent::GameWon {
                player: Player::P1,
                move_count: 2
            })
        );
        assert_eq!(game.winner(), Some(Player::P1));
        assert_eq!(game.apply_move(Player::P2, 3), Err(GameError::GameOver));
    }

    #[test]
    fn test_stepwise_move_holds_turn_until_settled() {
        let mut game = game_on("5000", 1, 4);
        game.begin_move(Player::P1, 0).unwrap();
        assert_eq!(game.phase, MatchPhase::Resolving(Player::P1));
        assert_eq!(game.begin_move(Player::P1, 3), Err(GameError::BoardBusy));

        let mut events = Vec::new();
        while let Some(event) = game.step() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(game.phase, MatchPhase::AwaitingMove(Player::P2));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut host = game_on("0000", 1, 4);
        host.apply_move(Player::P1, 2).unwrap();

        let mut peer = game_on("0000", 1, 4);
        peer.apply_snapshot(&host.snapshot()).unwrap();
        assert_eq!(peer.board, host.board);
        assert_eq!(peer.current_player, Player::P2);
        assert_eq!(peer.move_count, 1);
    }

    #[test]
    fn test_bad_snapshot_leaves_state() {
        let mut game = game_on("0100", 1, 4);
        let snapshot = Snapshot {
            current_player: Player::P2,
            move_count: 9,
            map_string: "00".into(),
            match_starter: Player::P1,
        };
        assert!(matches!(
            game.apply_snapshot(&snapshot),
            Err(GameError::Format(FormatError::LengthMismatch { .. }))
        ));
        assert_eq!(game.move_count, 0);
        assert_eq!(game.board.encode(), "0100");
    }

    #[test]
    fn test_regular_mode_advances_level_on_win() {
        let mut game = GameState::new(GameMode::Regular, 5, 5).unwrap();
        assert_eq!(game.next_match(), Err(GameError::MatchInProgress));

        game.phase = MatchPhase::Terminal { winner: Player::P1 };
        game.next_match().unwrap();
        assert_eq!(game.level, 2);
        assert_eq!(game.board, Board::for_level(5, 5, 2).unwrap());
        assert_eq!(game.phase, MatchPhase::AwaitingMove(Player::P1));

        game.phase = MatchPhase::Terminal { winner: Player::P2 };
        game.next_match().unwrap();
        assert_eq!(game.level, 2);
    }

    #[test]
    fn test_multiplayer_next_match_flips_starter() {
        let mut game = game_on("1006", 1, 4);
        game.phase = MatchPhase::Terminal { winner: Player::P1 };
        let event = game.next_match().unwrap();
        assert_eq!(event, GameEvent::MatchStarted { starter: Player::P2, level: 1 });
        assert_eq!(game.current_player, Player::P2);
        assert_eq!(game.board.encode(), "0000");
    }

    #[test]
    fn test_realtime_mode_rejects_turn_moves() {
        let mut game = GameState::new(GameMode::RealTime, 3, 3).unwrap();
        assert_eq!(game.apply_move(Player::P1, 0), Err(GameError::WrongMode));
    }
}
