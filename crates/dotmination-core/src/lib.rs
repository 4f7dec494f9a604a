//! Dotmination - a hex-grid chain reaction game engine
//!
//! This crate provides the core game logic for Dotmination, including:
//! - Hex grid geometry and the static adjacency graph
//! - Board representation and the MapString codec
//! - Chain reaction resolution with a board-wide chain lock
//! - Turn and match state machine for every game mode
//! - Real-time resource mode with cooldowns
//! - Random, Smart and real-time aggressive bots
//!
//! # Architecture
//!
//! The engine is synchronous and does no I/O. It can be compiled to:
//! - Native Rust for the networked client and tests
//! - WebAssembly for the browser front end (feature `wasm`)
//!
//! # Modules
//!
//! - [`hex`]: Grid coordinates and adjacency
//! - [`board`]: Cells, boards and MapString encoding
//! - [`chain`]: Chain reaction engine
//! - [`game`]: Match state machine
//! - [`realtime`]: Concurrent shared-board mode
//! - [`bot`]: AI opponents
//! - [`render`]: Presentation hooks

pub mod actions;
pub mod board;
pub mod bot;
pub mod chain;
pub mod game;
pub mod hex;
pub mod player;
pub mod realtime;
pub mod render;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{Board, Cell, FormatError, StartType, MAX_STAGE};
pub use bot::{AggressiveBot, Bot, BotDifficulty, OvertakePlan};
pub use chain::Resolution;
pub use game::{GameError, GameMode, GameState, MatchPhase, Snapshot};
pub use hex::{HexCoord, HexGrid};
pub use player::{Cooldown, Player, ResourcePool};
pub use realtime::{RealTimeConfig, RealTimeMatch};
pub use render::BoardRenderer;
