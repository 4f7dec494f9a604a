//! Real-time aggressive bot.
//!
//! The bot picks the opponent's highest-stage cell as its goal and plays
//! toward it along the adjacency graph. Two structures drive the choice:
//!
//! - the defensive band: own cells 2 to 4 steps from the goal, kept charged
//!   so an incoming chain meets a full cell
//! - the overtake plan: an own buffer cell next to an opponent full cell,
//!   plus two adjacent own bombs that both touch the buffer. With both bombs
//!   full and the buffer one short, clicking a bomb sets off both bombs and
//!   the double hit carries the buffer through the target.

use crate::actions::GameEvent;
use crate::board::{Board, MAX_STAGE};
use crate::game::GameError;
use crate::player::Player;
use crate::realtime::RealTimeMatch;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::time::Instant;

/// Path distances from the goal that make up the defensive band
pub const BAND_DISTANCE: RangeInclusive<usize> = 2..=4;

/// A coordinated double explosion aimed at one opponent full cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertakePlan {
    pub target: usize,
    pub buffer: usize,
    pub bombs: [usize; 2],
}

impl OvertakePlan {
    /// Whether the plan still holds together on `board` for `player`
    pub fn is_valid(&self, board: &Board, player: Player) -> bool {
        let owned = |index: usize| board.cell(index).is_some_and(|c| c.is_owned_by(player));
        let [a, b] = self.bombs;

        board
            .cell(self.target)
            .is_some_and(|c| c.is_owned_by(player.opponent()) && c.stage == MAX_STAGE)
            && owned(self.buffer)
            && owned(a)
            && owned(b)
            && board.are_adjacent(self.buffer, self.target)
            && board.are_adjacent(a, b)
            && board.are_adjacent(a, self.buffer)
            && board.are_adjacent(b, self.buffer)
    }

    /// Both bombs full and the buffer one short of full
    pub fn is_ready(&self, board: &Board) -> bool {
        self.bombs.iter().all(|&bomb| stage_of(board, bomb) == MAX_STAGE)
            && stage_of(board, self.buffer) >= MAX_STAGE - 1
    }

    /// The click that moves the plan forward: a bomb once ready, otherwise
    /// the next bomb to charge, then the buffer
    pub fn next_click(&self, board: &Board) -> Option<usize> {
        if self.is_ready(board) {
            return Some(self.bombs[0]);
        }
        if let Some(&bomb) = self.bombs.iter().find(|&&b| stage_of(board, b) < MAX_STAGE) {
            return Some(bomb);
        }
        (stage_of(board, self.buffer) < MAX_STAGE - 1).then_some(self.buffer)
    }

    fn weight(&self, board: &Board) -> u32 {
        [self.buffer, self.bombs[0], self.bombs[1]]
            .iter()
            .map(|&i| u32::from(stage_of(board, i)))
            .sum()
    }
}

fn stage_of(board: &Board, index: usize) -> u8 {
    board.cell(index).map_or(0, |c| c.stage)
}

/// Breadth-first path distance from `source` to every cell
pub fn distances_from(board: &Board, source: usize) -> Vec<Option<usize>> {
    let mut distances = vec![None; board.len()];
    if source >= board.len() {
        return distances;
    }

    let mut queue = VecDeque::from([source]);
    distances[source] = Some(0);
    while let Some(index) = queue.pop_front() {
        let next = distances[index].map_or(0, |d| d + 1);
        for &neighbor in board.neighbors_of(index) {
            if distances[neighbor].is_none() {
                distances[neighbor] = Some(next);
                queue.push_back(neighbor);
            }
        }
    }
    distances
}

/// Shortest path from `from` to `to`, both ends included
pub fn shortest_path(board: &Board, from: usize, to: usize) -> Option<Vec<usize>> {
    if from >= board.len() || to >= board.len() {
        return None;
    }

    let mut parent: Vec<Option<usize>> = vec![None; board.len()];
    let mut seen = vec![false; board.len()];
    let mut queue = VecDeque::from([from]);
    seen[from] = true;

    while let Some(index) = queue.pop_front() {
        if index == to {
            let mut path = vec![to];
            let mut current = to;
            while let Some(prev) = parent[current] {
                path.push(prev);
                current = prev;
            }
            path.reverse();
            return Some(path);
        }
        for &neighbor in board.neighbors_of(index) {
            if !seen[neighbor] {
                seen[neighbor] = true;
                parent[neighbor] = Some(index);
                queue.push_back(neighbor);
            }
        }
    }
    None
}

/// The opponent's highest-stage cell, lowest index on ties
pub fn goal_cell(board: &Board, player: Player) -> Option<usize> {
    board
        .owned_cells(player.opponent())
        .max_by_key(|c| (c.stage, Reverse(c.index)))
        .map(|c| c.index)
}

/// Own cells within the band distance of `goal`
pub fn defensive_band(board: &Board, player: Player, goal: usize) -> Vec<usize> {
    let distances = distances_from(board, goal);
    board
        .owned_cells(player)
        .filter(|c| distances[c.index].is_some_and(|d| BAND_DISTANCE.contains(&d)))
        .map(|c| c.index)
        .collect()
}

/// The heaviest overtake plan available to `player`, if any
pub fn find_overtake_plan(board: &Board, player: Player) -> Option<OvertakePlan> {
    let mut best: Option<(u32, OvertakePlan)> = None;

    let targets = board
        .owned_cells(player.opponent())
        .filter(|c| c.stage == MAX_STAGE)
        .map(|c| c.index);
    for target in targets {
        for &buffer in board.neighbors_of(target) {
            if !board.cell(buffer).is_some_and(|c| c.is_owned_by(player)) {
                continue;
            }
            let bombs: Vec<usize> = board
                .neighbors_of(buffer)
                .iter()
                .copied()
                .filter(|&n| n != target && board.cell(n).is_some_and(|c| c.is_owned_by(player)))
                .collect();

            for (i, &a) in bombs.iter().enumerate() {
                for &b in &bombs[i + 1..] {
                    if !board.are_adjacent(a, b) {
                        continue;
                    }
                    let plan = OvertakePlan {
                        target,
                        buffer,
                        bombs: [a.min(b), a.max(b)],
                    };
                    let weight = plan.weight(board);
                    if best.map_or(true, |(w, _)| weight > w) {
                        best = Some((weight, plan));
                    }
                }
            }
        }
    }
    best.map(|(_, plan)| plan)
}

/// Opponent for the real-time mode
pub struct AggressiveBot {
    pub player: Player,
    plan: Option<OvertakePlan>,
    rng: StdRng,
}

impl AggressiveBot {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            plan: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player: Player, seed: u64) -> Self {
        Self {
            player,
            plan: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The overtake plan currently being built
    pub fn plan(&self) -> Option<OvertakePlan> {
        self.plan
    }

    /// Pick the next click, or `None` while the board is locked or no move exists
    pub fn choose_move(&mut self, board: &Board) -> Option<usize> {
        if board.is_resolving() {
            return None;
        }
        let legal = board.legal_moves(self.player);
        if legal.is_empty() {
            return None;
        }

        if !self.plan.is_some_and(|plan| plan.is_valid(board, self.player)) {
            self.plan = find_overtake_plan(board, self.player);
        }
        if let Some(plan) = self.plan.filter(|p| p.is_ready(board)) {
            return Some(plan.bombs[0]);
        }

        let goal = goal_cell(board, self.player);
        if let Some(goal) = goal {
            let band = defensive_band(board, self.player, goal);
            if !band.iter().any(|&i| stage_of(board, i) == MAX_STAGE) {
                if let Some(&cell) = band.iter().max_by_key(|&&i| (stage_of(board, i), Reverse(i))) {
                    return Some(cell);
                }
            }
        }

        if let Some(click) = self.plan.and_then(|p| p.next_click(board)) {
            return Some(click);
        }

        if let Some(step) = goal.and_then(|g| self.advance_towards(board, g)) {
            return Some(step);
        }

        legal.choose(&mut self.rng).copied()
    }

    /// Step out from the own cell nearest the goal, or charge it when the
    /// next cell on the path belongs to the opponent
    fn advance_towards(&self, board: &Board, goal: usize) -> Option<usize> {
        let distances = distances_from(board, goal);
        let nearest = board
            .owned_cells(self.player)
            .filter_map(|c| distances[c.index].map(|d| (d, c.index)))
            .min()?
            .1;

        let path = shortest_path(board, nearest, goal)?;
        match path.get(1) {
            Some(&next) if board.cell(next).is_some_and(|c| c.is_playable_by(self.player)) => Some(next),
            _ => Some(nearest),
        }
    }

    /// Decide and submit a click through the real-time entry point.
    ///
    /// Returns `Ok(None)` when the bot is gated or has nothing to play.
    pub fn play(&mut self, game: &mut RealTimeMatch, now: Instant) -> Result<Option<GameEvent>, GameError> {
        if !game.can_act(self.player, now) {
            return Ok(None);
        }
        match self.choose_move(game.board()) {
            Some(index) => game.submit(self.player, index, now).map(Some),
            None => Ok(None),
        }
    }
}
