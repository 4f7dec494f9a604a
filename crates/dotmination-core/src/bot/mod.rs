//! AI bot players for Dotmination.
//!
//! This module provides the turn-based opponents:
//! - Random: any legal cell, with one opportunistic rule
//! - Smart: neighborhood heuristics with safety filtering (see [`smart`])
//!
//! and, in [`aggressive`], the opponent for real-time play.
//!
//! Bots only read the board. Their moves go through the same entry points a
//! human click uses (`GameState::apply_move`, `RealTimeMatch::submit`).

pub mod aggressive;
pub mod smart;

use crate::board::{Board, MAX_STAGE};
use crate::chain::Resolution;
use crate::game::{GameError, GameState};
use crate::player::Player;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub use aggressive::{AggressiveBot, OvertakePlan};
pub use smart::CellScore;

/// How many of its own recent moves a bot avoids repeating
pub const RECENT_MOVES: usize = 3;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Random,
    Smart,
}

/// Bounded history of a bot's last moves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentMoves {
    moves: VecDeque<usize>,
}

impl RecentMoves {
    pub fn push(&mut self, index: usize) {
        if self.moves.len() == RECENT_MOVES {
            self.moves.pop_front();
        }
        self.moves.push_back(index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.moves.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clear(&mut self) {
        self.moves.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.moves.iter()
    }
}

/// Per-match decision state, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotContext {
    pub difficulty: BotDifficulty,
    pub recent_moves: RecentMoves,
}

impl BotContext {
    pub fn new(difficulty: BotDifficulty) -> Self {
        Self {
            difficulty,
            recent_moves: RecentMoves::default(),
        }
    }
}

/// A bot player for the turn-based modes
pub struct Bot {
    pub player: Player,
    context: BotContext,
    rng: StdRng,
}

impl Bot {
    pub fn new(player: Player, difficulty: BotDifficulty) -> Self {
        Self {
            player,
            context: BotContext::new(difficulty),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player: Player, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player,
            context: BotContext::new(difficulty),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> BotDifficulty {
        self.context.difficulty
    }

    pub fn context(&self) -> &BotContext {
        &self.context
    }

    /// Forget the previous match
    pub fn reset(&mut self) {
        self.context.recent_moves.clear();
    }

    /// Choose a cell to click, or `None` when it is not this bot's move
    pub fn choose_move(&mut self, game: &GameState) -> Option<usize> {
        let legal = game.valid_moves(self.player);
        if legal.is_empty() {
            return None;
        }

        let choice = match self.context.difficulty {
            BotDifficulty::Random => self.choose_random(&game.board, &legal),
            BotDifficulty::Smart => smart::choose(
                &game.board,
                self.player,
                &legal,
                game.move_count,
                &self.context.recent_moves,
                &mut self.rng,
            ),
        }?;

        self.context.recent_moves.push(choice);
        Some(choice)
    }

    /// Choose a move and play it through the regular move entry point
    pub fn play(&mut self, game: &mut GameState) -> Result<Option<Resolution>, GameError> {
        match self.choose_move(game) {
            Some(index) => game.apply_move(self.player, index).map(Some),
            None => Ok(None),
        }
    }

    /// Random: set off a full cell next to an opponent's full cell if one
    /// exists, otherwise any legal cell
    fn choose_random(&mut self, board: &Board, legal: &[usize]) -> Option<usize> {
        let hits = mutual_full_hits(board, self.player, legal);
        if let Some(&hit) = hits.choose(&mut self.rng) {
            return Some(hit);
        }
        legal.choose(&mut self.rng).copied()
    }
}

/// Own full cells that touch an opponent's full cell
pub(crate) fn mutual_full_hits(board: &Board, player: Player, legal: &[usize]) -> Vec<usize> {
    legal
        .iter()
        .copied()
        .filter(|&index| {
            board.cell(index).is_some_and(|cell| {
                cell.is_owned_by(player)
                    && cell.stage == MAX_STAGE
                    && board.neighbors_of(index).iter().any(|&n| {
                        board
                            .cell(n)
                            .is_some_and(|c| c.is_owned_by(player.opponent()) && c.stage == MAX_STAGE)
                    })
            })
        })
        .collect()
}
