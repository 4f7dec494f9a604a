//! Heuristic move scoring for the Smart bot.
//!
//! Every legal cell is scored from its neighborhood: nearby own high-stage
//! cells (chain potential), nearby opponent high-stage cells (disruption
//! potential), spreading into open space, and contact with the opponent in
//! the opening. Cells that a much stronger opponent neighbor could take back
//! cheaply are flagged unsafe and only played when nothing safe is left.

use super::{mutual_full_hits, RecentMoves};
use crate::board::Board;
use crate::player::Player;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Neighbors at or above this stage count toward chain and disruption potential
const HIGH_STAGE: u8 = 3;
/// Multiplier applied to chain potential
const CHAIN_WEIGHT: i32 = 2;
/// Bonus for claiming an empty cell with no own neighbors
const SPARSITY_BONUS: i32 = 2;
/// Moves that count as the opening
const EARLY_GAME_MOVES: u32 = 6;
/// Opening bonus for cells touching the opponent
const EARLY_GAME_BONUS: i32 = 3;
/// Minimum score for a cell to be picked outright
const SCORE_THRESHOLD: i32 = 4;
/// How many top cells to pick from when none clears the threshold
const TOP_CANDIDATES: usize = 3;
/// Own stages below this are considered weak
const WEAK_STAGE: u8 = 3;
/// Stage lead an opponent neighbor needs to make a weak cell unsafe
const DANGER_GAP: u8 = 3;

/// Heuristic breakdown for one legal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellScore {
    pub index: usize,
    pub chain_potential: i32,
    pub disrupt_potential: i32,
    pub is_safe: bool,
    pub score: i32,
}

/// Weight of a high-stage neighbor: 1 at stage 3 up to 3 at stage 5
fn stage_weight(stage: u8) -> i32 {
    i32::from(stage.saturating_sub(HIGH_STAGE - 1))
}

/// Score a single cell for `player`
pub fn score_cell(board: &Board, player: Player, index: usize, move_count: u32) -> CellScore {
    let own_stage = board.cell(index).map_or(0, |c| c.stage);
    let is_empty = board.cell(index).map_or(true, |c| c.is_empty());

    let mut chain_potential = 0;
    let mut disrupt_potential = 0;
    let mut has_own_neighbor = false;
    let mut touches_opponent = false;
    let mut is_safe = true;

    for &neighbor in board.neighbors_of(index) {
        let Some(cell) = board.cell(neighbor) else {
            continue;
        };
        match cell.owner {
            Some(owner) if owner == player => {
                has_own_neighbor = true;
                if cell.stage >= HIGH_STAGE {
                    chain_potential += stage_weight(cell.stage);
                }
            }
            Some(_) => {
                touches_opponent = true;
                if cell.stage >= HIGH_STAGE {
                    disrupt_potential += stage_weight(cell.stage);
                }
                if own_stage < WEAK_STAGE && cell.stage >= own_stage + DANGER_GAP {
                    is_safe = false;
                }
            }
            None => {}
        }
    }

    let mut score = chain_potential * CHAIN_WEIGHT + disrupt_potential;
    if is_empty && !has_own_neighbor {
        score += SPARSITY_BONUS;
    }
    if move_count < EARLY_GAME_MOVES && touches_opponent {
        score += EARLY_GAME_BONUS;
    }

    CellScore {
        index,
        chain_potential,
        disrupt_potential,
        is_safe,
        score,
    }
}

/// Score every legal cell
pub fn score_moves(board: &Board, player: Player, legal: &[usize], move_count: u32) -> Vec<CellScore> {
    legal
        .iter()
        .map(|&index| score_cell(board, player, index, move_count))
        .collect()
}

/// Pick a move.
///
/// Safe cells come first: the best one if it clears the threshold, else a
/// random pick among the top few. With no safe cell the bot falls back to a
/// mutual full-cell hit, then the best cell not played recently, then any
/// cell not played recently.
pub(crate) fn choose<R: Rng>(
    board: &Board,
    player: Player,
    legal: &[usize],
    move_count: u32,
    recent: &RecentMoves,
    rng: &mut R,
) -> Option<usize> {
    let scores = score_moves(board, player, legal, move_count);

    let mut safe: Vec<&CellScore> = scores.iter().filter(|s| s.is_safe).collect();
    if !safe.is_empty() {
        safe.sort_by(|a, b| b.score.cmp(&a.score));
        let best = safe[0].score;
        if best > SCORE_THRESHOLD {
            let tied: Vec<_> = safe.iter().filter(|s| s.score == best).collect();
            return tied.choose(rng).map(|s| s.index);
        }
        return safe
            .iter()
            .take(TOP_CANDIDATES)
            .collect::<Vec<_>>()
            .choose(rng)
            .map(|s| s.index);
    }

    if let Some(&hit) = mutual_full_hits(board, player, legal).choose(rng) {
        return Some(hit);
    }

    let fresh: Vec<&CellScore> = scores.iter().filter(|s| !recent.contains(s.index)).collect();
    if let Some(best) = fresh.iter().max_by_key(|s| s.score) {
        return Some(best.index);
    }

    let fresh_cells: Vec<usize> = legal.iter().copied().filter(|&i| !recent.contains(i)).collect();
    fresh_cells
        .choose(rng)
        .or_else(|| legal.choose(rng))
        .copied()
}
