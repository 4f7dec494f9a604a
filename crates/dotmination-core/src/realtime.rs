//! Real-time resource mode.
//!
//! Both players click the same board at the same time. Turn order is replaced
//! by three gates: a per-player resource budget that regenerates on a timer,
//! a short per-player cooldown after every accepted move, and the board's
//! chain lock, which keeps two chains from interleaving.
//!
//! Time is always passed in, so callers decide how ticks are scheduled.

use crate::actions::GameEvent;
use crate::board::Board;
use crate::game::{GameError, GameMode, GameState, MatchPhase};
use crate::player::{Cooldown, Player, ResourcePool};
use std::time::{Duration, Instant};

pub const STARTING_RESOURCES: u32 = 3;
pub const REGEN_AMOUNT: u32 = 1;
pub const REGEN_INTERVAL: Duration = Duration::from_secs(2);
pub const ACTION_COOLDOWN: Duration = Duration::from_millis(300);

/// Tunables for a real-time match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealTimeConfig {
    pub starting_resources: u32,
    pub regen_amount: u32,
    pub regen_interval: Duration,
    pub cooldown: Duration,
}

impl Default for RealTimeConfig {
    fn default() -> Self {
        Self {
            starting_resources: STARTING_RESOURCES,
            regen_amount: REGEN_AMOUNT,
            regen_interval: REGEN_INTERVAL,
            cooldown: ACTION_COOLDOWN,
        }
    }
}

/// A shared-board match where both players act concurrently
#[derive(Debug, Clone)]
pub struct RealTimeMatch {
    game: GameState,
    pools: [ResourcePool; 2],
    cooldowns: [Cooldown; 2],
    config: RealTimeConfig,
}

impl RealTimeMatch {
    pub fn new(board: Board, config: RealTimeConfig, now: Instant) -> Self {
        let pool = || {
            ResourcePool::new(
                config.starting_resources,
                config.regen_amount,
                config.regen_interval,
                now,
            )
        };
        Self {
            game: GameState::with_board(GameMode::RealTime, board),
            pools: [pool(), pool()],
            cooldowns: [Cooldown::default(), Cooldown::default()],
            config,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn board(&self) -> &Board {
        &self.game.board
    }

    pub fn config(&self) -> &RealTimeConfig {
        &self.config
    }

    pub fn resources(&self, player: Player) -> u32 {
        self.pools[player.index()].available()
    }

    pub fn is_on_cooldown(&self, player: Player, now: Instant) -> bool {
        self.cooldowns[player.index()].is_active(now)
    }

    pub fn is_finished(&self) -> bool {
        self.game.is_finished()
    }

    pub fn winner(&self) -> Option<Player> {
        self.game.winner()
    }

    /// Credit resources for every regeneration interval that has passed
    pub fn tick(&mut self, now: Instant) {
        for pool in &mut self.pools {
            pool.regenerate(now);
        }
    }

    /// Whether `player` could have a move accepted right now
    pub fn can_act(&self, player: Player, now: Instant) -> bool {
        !self.is_finished()
            && !self.is_on_cooldown(player, now)
            && self.resources(player) > 0
            && !self.is_busy()
    }

    fn is_busy(&self) -> bool {
        matches!(self.game.phase, MatchPhase::Resolving(_)) || self.game.board.is_resolving()
    }

    /// Submit a click.
    ///
    /// On acceptance one resource is spent, the actor's cooldown is armed and
    /// the first increment is applied. Drive the rest with `step`.
    pub fn submit(&mut self, player: Player, index: usize, now: Instant) -> Result<GameEvent, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if self.is_on_cooldown(player, now) {
            return Err(GameError::OnCooldown);
        }
        if self.resources(player) == 0 {
            return Err(GameError::NoResources);
        }
        if self.is_busy() {
            return Err(GameError::BoardBusy);
        }

        let event = self.game.start_resolution(player, index)?;
        self.pools[player.index()].try_spend();
        self.cooldowns[player.index()].arm(now, self.config.cooldown);
        Ok(event)
    }

    /// Process one step of the chain in flight, then the win check
    pub fn step(&mut self) -> Option<GameEvent> {
        self.game.step()
    }

    /// Run the move in flight to completion
    pub fn settle(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.step() {
            events.push(event);
        }
        events
    }
}
