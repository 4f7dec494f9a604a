//! Chain reaction resolution.
//!
//! A move adds one stage to its target. A cell pushed past `MAX_STAGE` is
//! neutralized and queues one increment on every neighbor, whoever owns it.
//! Queued increments are processed first-in first-out, each one credited to
//! the player whose move started the chain, until the queue is empty.
//!
//! While a chain is being resolved the board is locked: any further move is
//! rejected with `GameError::BoardBusy` until the queue drains.

use crate::actions::GameEvent;
use crate::board::{Board, MAX_STAGE};
use crate::game::GameError;
use crate::player::Player;
use serde::{Deserialize, Serialize};

/// Outcome of a fully resolved move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Every processed increment, in order
    pub events: Vec<GameEvent>,
    /// Whether at least one cell exploded
    pub exploded: bool,
}

impl Resolution {
    pub fn explosion_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_explosion()).count()
    }
}

impl Board {
    /// Whether a chain is in flight
    pub fn is_resolving(&self) -> bool {
        self.chain_actor.is_some()
    }

    /// Number of increments still queued
    pub fn queued_increments(&self) -> usize {
        self.chain.len()
    }

    /// Check a move against the lock and ownership rules without applying it
    pub fn check_move(&self, index: usize, player: Player) -> Result<(), GameError> {
        let cell = self.cells.get(index).ok_or(GameError::OutOfRange(index))?;
        if self.is_resolving() {
            return Err(GameError::BoardBusy);
        }
        if !cell.is_playable_by(player) {
            return Err(GameError::IllegalMove(index));
        }
        Ok(())
    }

    /// Apply a move and resolve its whole chain
    pub fn apply_move(&mut self, index: usize, player: Player) -> Result<Resolution, GameError> {
        let first = self.begin_move(index, player)?;
        let mut events = vec![first];
        while let Some(event) = self.step_chain() {
            events.push(event);
        }

        let exploded = events.iter().any(GameEvent::is_explosion);
        Ok(Resolution { events, exploded })
    }

    /// Validate a move, take the lock and apply its first increment.
    ///
    /// The lock is released right away when the increment does not explode.
    pub fn begin_move(&mut self, index: usize, player: Player) -> Result<GameEvent, GameError> {
        self.check_move(index, player)?;

        self.chain_actor = Some(player);
        let event = self.increment(index, player);
        if self.chain.is_empty() {
            self.chain_actor = None;
        }
        Ok(event)
    }

    /// Process one queued increment.
    ///
    /// Returns `None` when nothing is in flight.
    pub fn step_chain(&mut self) -> Option<GameEvent> {
        let actor = self.chain_actor?;
        let event = self.chain.pop_front().map(|index| {
            let cell = &mut self.cells[index];
            cell.pending_increments = cell.pending_increments.saturating_sub(1);
            self.increment(index, actor)
        });

        if self.chain.is_empty() {
            self.chain_actor = None;
        }
        event
    }

    /// Drain the queue; returns the events processed
    pub fn finish_chain(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.step_chain() {
            events.push(event);
        }
        events
    }

    fn increment(&mut self, index: usize, player: Player) -> GameEvent {
        let cell = &mut self.cells[index];
        match cell.stage {
            0 => {
                cell.stage = 1;
                cell.owner = Some(player);
                GameEvent::CellClaimed { index, player }
            }
            stage if stage < MAX_STAGE => {
                let captured_from = cell.owner.filter(|&owner| owner != player);
                cell.stage = stage + 1;
                cell.owner = Some(player);
                GameEvent::CellCharged {
                    index,
                    player,
                    stage: stage + 1,
                    captured_from,
                }
            }
            _ => {
                cell.neutralize();
                let neighbors = self.neighbors_of(index).to_vec();
                for &neighbor in &neighbors {
                    self.cells[neighbor].pending_increments += 1;
                    self.chain.push_back(neighbor);
                }
                GameEvent::CellExploded {
                    index,
                    player,
                    neighbors,
                }
            }
        }
    }
}
