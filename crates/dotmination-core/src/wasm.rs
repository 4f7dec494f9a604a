//! WebAssembly bindings for the Dotmination engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.
//! Players are passed as seat numbers (1 or 2); structured values go out as
//! JSON strings.

use wasm_bindgen::prelude::*;

use crate::actions::GameAction;
use crate::board::Board;
use crate::bot::{Bot, BotDifficulty};
use crate::game::{GameMode, GameState};
use crate::player::Player;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn player_from_seat(seat: u8) -> Result<Player, JsValue> {
    match seat {
        1 => Ok(Player::P1),
        2 => Ok(Player::P2),
        other => Err(JsValue::from_str(&format!("Invalid player seat: {}", other))),
    }
}

fn seat_of(player: Player) -> u8 {
    player.index() as u8 + 1
}

fn mode_from_str(mode: &str) -> Result<GameMode, JsValue> {
    match mode {
        "regular" => Ok(GameMode::Regular),
        "random" => Ok(GameMode::Random),
        "multiplayer" => Ok(GameMode::Multiplayer),
        "realtime" => Ok(GameMode::RealTime),
        other => Err(JsValue::from_str(&format!("Unknown mode: {}", other))),
    }
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    bot: Option<Bot>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game. `mode` is one of "regular", "random",
    /// "multiplayer" or "realtime".
    #[wasm_bindgen(constructor)]
    pub fn new(mode: &str, rows: usize, cols: usize) -> Result<WasmGame, JsValue> {
        let mode = mode_from_str(mode)?;
        let state = GameState::new(mode, rows, cols).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state, bot: None })
    }

    /// Create a game from a map string
    #[wasm_bindgen(js_name = fromMapString)]
    pub fn from_map_string(mode: &str, rows: usize, cols: usize, map: &str) -> Result<WasmGame, JsValue> {
        let mode = mode_from_str(mode)?;
        let board = Board::decode(rows, cols, map).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame {
            state: GameState::with_board(mode, board),
            bot: None,
        })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the board as a map string
    #[wasm_bindgen(js_name = getMapString)]
    pub fn get_map_string(&self) -> String {
        self.state.board.encode()
    }

    /// Get the seat whose turn it is
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        seat_of(self.state.current_player)
    }

    /// Get the cells a player may click as a JSON array
    #[wasm_bindgen(js_name = getValidMoves)]
    pub fn get_valid_moves(&self, seat: u8) -> Result<String, JsValue> {
        let moves = self.state.valid_moves(player_from_seat(seat)?);
        Ok(serde_json::to_string(&moves).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Get the neighbors of a cell as a JSON array
    #[wasm_bindgen(js_name = getNeighbors)]
    pub fn get_neighbors(&self, index: usize) -> String {
        let neighbors: &[usize] = if index < self.state.board.len() {
            self.state.board.neighbors_of(index)
        } else {
            &[]
        };
        serde_json::to_string(neighbors).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, seat: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(player_from_seat(seat)?, action) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Click a cell, returns events JSON or error
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, seat: u8, index: usize) -> Result<String, JsValue> {
        let resolution = self
            .state
            .apply_move(player_from_seat(seat)?, index)
            .map_err(|e| JsValue::from_str(&format!("Move failed: {}", e)))?;
        Ok(serde_json::to_string(&resolution.events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winning seat (if game is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.winner().map(seat_of)
    }

    /// Get the Regular-mode level
    #[wasm_bindgen(js_name = getLevel)]
    pub fn get_level(&self) -> u32 {
        self.state.level
    }

    /// Start the next match once this one is over
    #[wasm_bindgen(js_name = nextMatch)]
    pub fn next_match(&mut self) -> Result<String, JsValue> {
        if let Some(bot) = self.bot.as_mut() {
            bot.reset();
        }
        let event = self
            .state
            .next_match()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_json::to_string(&event).unwrap_or_else(|_| "null".to_string()))
    }

    /// Get a bot's move for a seat.
    /// difficulty: "Random" or "Smart"
    #[wasm_bindgen(js_name = getBotMove)]
    pub fn get_bot_move(&mut self, seat: u8, difficulty: &str) -> Result<Option<usize>, JsValue> {
        let player = player_from_seat(seat)?;
        let difficulty = match difficulty {
            "Random" => BotDifficulty::Random,
            _ => BotDifficulty::Smart,
        };

        // The bot keeps its recent-move memory for the whole match
        let same_bot = self
            .bot
            .as_ref()
            .is_some_and(|bot| bot.player == player && bot.difficulty() == difficulty);
        if !same_bot {
            self.bot = Some(Bot::new(player, difficulty));
        }
        let bot = self.bot.get_or_insert_with(|| Bot::new(player, difficulty));
        Ok(bot.choose_move(&self.state))
    }
}
