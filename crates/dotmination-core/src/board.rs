//! Game board representation: cells, ownership and map strings.
//!
//! This module contains:
//! - `Cell`, one charged position on the grid
//! - `Board`, the ordered collection of cells over a shared `HexGrid`
//! - The map string codec used for shareable puzzles and full-state sync
//! - Board generators for blank, half-filled, random and level boards

use crate::hex::HexGrid;
use crate::player::Player;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Highest charge a cell can hold; one more increment makes it explode
pub const MAX_STAGE: u8 = 5;

/// Stage given to every cell of a half-filled start
pub const HALF_FILLED_STAGE: u8 = 1;

/// Default board size used by the solo modes
pub const DEFAULT_ROWS: usize = 9;
pub const DEFAULT_COLS: usize = 7;

/// Chance that a cell is pre-filled on a random board
const RANDOM_FILL_CHANCE: f64 = 0.3;

/// Errors from decoding a map string
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FormatError {
    #[error("Map string has {found} cells, board needs {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Invalid map digit {found:?} at position {position}")]
    InvalidDigit { position: usize, found: char },

    #[error("Invalid board dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
}

/// Initial fill pattern for a fresh multiplayer match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartType {
    /// Every cell empty
    Blank,
    /// First half of the cells to P1, second half to P2
    HalfFilled,
}

impl StartType {
    /// Short name used in lobby identifiers and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            StartType::Blank => "blank",
            StartType::HalfFilled => "half-filled",
        }
    }
}

impl fmt::Display for StartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Row-major position
    pub index: usize,
    /// Charge level, 0 (unclaimed) to `MAX_STAGE`
    pub stage: u8,
    /// Current owner, `None` exactly when the stage is 0
    pub owner: Option<Player>,
    /// Increments queued by explosions and not yet processed
    pub pending_increments: u32,
}

impl Cell {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            stage: 0,
            owner: None,
            pending_increments: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, player: Player) -> bool {
        self.owner == Some(player)
    }

    /// Whether `player` may click this cell
    pub fn is_playable_by(&self, player: Player) -> bool {
        self.owner.is_none() || self.owner == Some(player)
    }

    /// Map digit for this cell: stage, plus 5 when owned by P2
    pub fn digit(&self) -> u8 {
        match self.owner {
            Some(owner) => self.stage + owner.digit_offset(),
            None => 0,
        }
    }

    fn from_digit(index: usize, digit: u8) -> Self {
        let (stage, owner) = match digit {
            0 => (0, None),
            1..=5 => (digit, Some(Player::P1)),
            _ => (digit - 5, Some(Player::P2)),
        };
        Self {
            index,
            stage,
            owner,
            pending_increments: 0,
        }
    }

    pub(crate) fn neutralize(&mut self) {
        self.stage = 0;
        self.owner = None;
    }
}

/// The game board.
///
/// Clones share the same geometry; only the cells are copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BoardRepr", try_from = "BoardRepr")]
pub struct Board {
    grid: Arc<HexGrid>,
    pub(crate) cells: Vec<Cell>,
    /// FIFO of cells waiting for one queued increment each
    pub(crate) chain: VecDeque<usize>,
    /// Player credited for the resolution in flight, if any
    pub(crate) chain_actor: Option<Player>,
}

/// Wire-friendly board form: dimensions plus map string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardRepr {
    pub rows: usize,
    pub cols: usize,
    pub map: String,
}

impl From<Board> for BoardRepr {
    fn from(board: Board) -> Self {
        Self {
            rows: board.rows(),
            cols: board.cols(),
            map: board.encode(),
        }
    }
}

impl TryFrom<BoardRepr> for Board {
    type Error = FormatError;

    fn try_from(repr: BoardRepr) -> Result<Self, Self::Error> {
        Board::decode(repr.rows, repr.cols, &repr.map)
    }
}

impl Board {
    /// Create an empty board with `rows` rows alternating `cols` and `cols - 1` cells
    pub fn new(rows: usize, cols: usize) -> Result<Self, FormatError> {
        let grid = HexGrid::new(rows, cols).ok_or(FormatError::InvalidDimensions { rows, cols })?;
        Ok(Self::with_grid(Arc::new(grid)))
    }

    /// Empty board using the default solo dimensions
    pub fn standard() -> Self {
        let grid = HexGrid::new(DEFAULT_ROWS, DEFAULT_COLS)
            .unwrap_or_else(|| unreachable!("default dimensions are valid"));
        Self::with_grid(Arc::new(grid))
    }

    fn with_grid(grid: Arc<HexGrid>) -> Self {
        let cells = (0..grid.len()).map(Cell::empty).collect();
        Self {
            grid,
            cells,
            chain: VecDeque::new(),
            chain_actor: None,
        }
    }

    /// Decode a map string for a board of the given size.
    ///
    /// Fails without producing a board if the length differs from the cell
    /// count or any character is not a hex digit in `0..=A`.
    pub fn decode(rows: usize, cols: usize, map: &str) -> Result<Self, FormatError> {
        let mut board = Self::new(rows, cols)?;
        board.load_map_string(map)?;
        Ok(board)
    }

    /// Replace every cell from a map string.
    ///
    /// The board is left untouched if decoding fails.
    pub fn load_map_string(&mut self, map: &str) -> Result<(), FormatError> {
        let found = map.chars().count();
        if found != self.len() {
            return Err(FormatError::LengthMismatch {
                expected: self.len(),
                found,
            });
        }

        let cells = map
            .chars()
            .enumerate()
            .map(|(position, ch)| match ch.to_digit(16) {
                Some(digit) if digit <= 10 => Ok(Cell::from_digit(position, digit as u8)),
                _ => Err(FormatError::InvalidDigit { position, found: ch }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.cells = cells;
        self.chain.clear();
        self.chain_actor = None;
        Ok(())
    }

    /// Serialize to a map string, one uppercase hex digit per cell
    pub fn encode(&self) -> String {
        self.cells
            .iter()
            .map(|cell| {
                char::from_digit(cell.digit() as u32, 16)
                    .unwrap_or('0')
                    .to_ascii_uppercase()
            })
            .collect()
    }

    /// Board for a Regular-mode level.
    ///
    /// Deterministic per level number; higher levels start with more charge.
    pub fn for_level(rows: usize, cols: usize, level: u32) -> Result<Self, FormatError> {
        let mut rng = StdRng::seed_from_u64(u64::from(level));
        let fill = (0.15 + 0.05 * f64::from(level.saturating_sub(1))).min(0.6);
        Self::generate(rows, cols, fill, &mut rng)
    }

    /// Board for Random mode
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Result<Self, FormatError> {
        Self::generate(rows, cols, RANDOM_FILL_CHANCE, rng)
    }

    /// Fill cells at random until both players own at least one cell
    fn generate<R: Rng>(
        rows: usize,
        cols: usize,
        fill: f64,
        rng: &mut R,
    ) -> Result<Self, FormatError> {
        let mut board = Self::new(rows, cols)?;
        loop {
            for cell in &mut board.cells {
                if rng.gen_bool(fill) {
                    cell.stage = rng.gen_range(1..MAX_STAGE);
                    cell.owner = Some(if rng.gen_bool(0.5) { Player::P1 } else { Player::P2 });
                } else {
                    cell.neutralize();
                }
            }
            if Player::ALL.iter().all(|&p| board.piece_count(p) > 0) {
                return Ok(board);
            }
        }
    }

    /// Reset every cell according to a start pattern
    pub fn clear(&mut self, start: StartType) {
        let half = self.len() / 2;
        for cell in &mut self.cells {
            cell.pending_increments = 0;
            match start {
                StartType::Blank => cell.neutralize(),
                StartType::HalfFilled => {
                    cell.stage = HALF_FILLED_STAGE;
                    cell.owner = Some(if cell.index < half { Player::P1 } else { Player::P2 });
                }
            }
        }
        self.chain.clear();
        self.chain_actor = None;
    }

    /// Shared geometry
    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Set a cell's stage and owner directly (puzzle editing and tests).
    ///
    /// A stage of 0 clears the owner; a non-zero stage without an owner is
    /// ignored so the ownership invariant always holds.
    pub fn set_cell(&mut self, index: usize, stage: u8, owner: Option<Player>) {
        if let Some(cell) = self.cells.get_mut(index) {
            match (stage.min(MAX_STAGE), owner) {
                (0, _) | (_, None) => cell.neutralize(),
                (stage, Some(owner)) => {
                    cell.stage = stage;
                    cell.owner = Some(owner);
                }
            }
        }
    }

    pub fn neighbors_of(&self, index: usize) -> &[usize] {
        self.grid.neighbors(index)
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.grid.are_adjacent(a, b)
    }

    /// Cells `player` may click: empty or already theirs
    pub fn legal_moves(&self, player: Player) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|c| c.is_playable_by(player))
            .map(|c| c.index)
            .collect()
    }

    /// Number of cells owned by `player`
    pub fn piece_count(&self, player: Player) -> usize {
        self.cells.iter().filter(|c| c.is_owned_by(player)).count()
    }

    /// Cells owned by `player`
    pub fn owned_cells(&self, player: Player) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(move |c| c.is_owned_by(player))
    }
}
