//! Game actions that players can take.
//!
//! This module defines the requests a player (human, bot or relayed network
//! message) can submit and the events that result from resolving them.

use crate::player::Player;
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Click a cell
    Move(usize),
    /// Start the next match once the current one is over
    NextMatch,
}

/// Events that occur as a result of actions.
///
/// A chain resolution emits one event per processed increment, in order, so
/// a renderer can replay it step by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An unclaimed cell was taken at stage 1
    CellClaimed { index: usize, player: Player },

    /// A claimed cell gained one stage
    CellCharged {
        index: usize,
        player: Player,
        stage: u8,
        /// Previous owner when the increment converted an opponent cell
        captured_from: Option<Player>,
    },

    /// A full cell was neutralized and charged each of its neighbors
    CellExploded {
        index: usize,
        player: Player,
        neighbors: Vec<usize>,
    },

    /// The move resolved and the turn moved on
    TurnPassed {
        player: Player,
        next_player: Player,
        move_count: u32,
    },

    /// A player was wiped off the board
    GameWon { player: Player, move_count: u32 },

    /// A new match started
    MatchStarted { starter: Player, level: u32 },
}

impl GameEvent {
    pub fn is_explosion(&self) -> bool {
        matches!(self, GameEvent::CellExploded { .. })
    }
}
