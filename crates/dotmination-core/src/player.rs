//! Player identity and per-player resources.
//!
//! This module contains:
//! - `Player`, the two sides of a match
//! - `ResourcePool`, the regenerating move budget used by real-time play
//! - `Cooldown`, the expiring per-actor action gate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    /// First player (host in multiplayer, human in solo modes)
    P1,
    /// Second player (peer in multiplayer, bot in solo modes)
    P2,
}

impl Player {
    /// Both players in seat order
    pub const ALL: [Player; 2] = [Player::P1, Player::P2];

    /// The other side
    pub const fn opponent(self) -> Player {
        match self {
            Player::P1 => Player::P2,
            Player::P2 => Player::P1,
        }
    }

    /// Offset added to a cell's stage when it is written into a map string
    pub const fn digit_offset(self) -> u8 {
        match self {
            Player::P1 => 0,
            Player::P2 => 5,
        }
    }

    /// Zero-based seat index, handy for per-player arrays
    pub const fn index(self) -> usize {
        match self {
            Player::P1 => 0,
            Player::P2 => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::P1 => write!(f, "P1"),
            Player::P2 => write!(f, "P2"),
        }
    }
}

/// Regenerating move budget.
///
/// Starts at a fixed amount, grows by `regen_amount` every `regen_interval`
/// and is spent one unit per accepted move.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    available: u32,
    regen_amount: u32,
    regen_interval: Duration,
    last_regen: Instant,
}

impl ResourcePool {
    pub fn new(start: u32, regen_amount: u32, regen_interval: Duration, now: Instant) -> Self {
        Self {
            available: start,
            regen_amount,
            regen_interval,
            last_regen: now,
        }
    }

    /// Units currently available
    pub fn available(&self) -> u32 {
        self.available
    }

    /// Credit every full interval elapsed since the last credit.
    ///
    /// Returns how many units were added.
    pub fn regenerate(&mut self, now: Instant) -> u32 {
        let interval = self.regen_interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        let elapsed = now.saturating_duration_since(self.last_regen);
        let ticks = u32::try_from(elapsed.as_nanos() / interval).unwrap_or(u32::MAX);
        if ticks == 0 {
            return 0;
        }
        let gained = ticks.saturating_mul(self.regen_amount);
        self.available = self.available.saturating_add(gained);
        self.last_regen += self.regen_interval * ticks;
        gained
    }

    /// Spend one unit; false when the pool is empty
    pub fn try_spend(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }
}

/// Expiring per-actor flag armed after each accepted action.
#[derive(Debug, Clone, Default)]
pub struct Cooldown {
    until: Option<Instant>,
}

impl Cooldown {
    pub fn arm(&mut self, now: Instant, duration: Duration) {
        self.until = Some(now + duration);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Time left before the flag expires
    pub fn remaining(&self, now: Instant) -> Duration {
        self.until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }
}
