//! Hex grid geometry using offset coordinates (row, col).
//!
//! The board is a staggered grid: even rows hold `cols` cells, odd rows hold
//! `cols - 1` cells and sit half a cell to the right. Cells are numbered in
//! row-major order, which is also the order used by map strings.
//!
//! Adjacency is derived once from this geometry when a `HexGrid` is built and
//! never recomputed afterwards.

use serde::{Deserialize, Serialize};

/// Position of a cell in the staggered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    /// Row, increasing downward
    pub row: usize,
    /// Column within the row, increasing to the right
    pub col: usize,
}

impl HexCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Candidate neighbor positions, before range checks.
    ///
    /// Same row: left and right. Even rows reach diagonally to `col - 1` and
    /// `col` of the shorter rows around them; odd rows reach `col` and
    /// `col + 1` of the longer rows around them.
    fn neighbor_candidates(&self) -> Vec<(isize, isize)> {
        let r = self.row as isize;
        let c = self.col as isize;
        let (left, right) = if self.row % 2 == 0 { (c - 1, c) } else { (c, c + 1) };

        vec![
            (r, c - 1),
            (r, c + 1),
            (r - 1, left),
            (r - 1, right),
            (r + 1, left),
            (r + 1, right),
        ]
    }
}

/// Static geometry of a board: dimensions, row offsets and adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexGrid {
    rows: usize,
    cols: usize,
    /// Index of the first cell of each row
    row_starts: Vec<usize>,
    adjacency: Vec<Vec<usize>>,
}

impl HexGrid {
    /// Build the geometry for `rows` rows alternating `cols` and `cols - 1` cells.
    ///
    /// Returns `None` for degenerate sizes (no rows, or odd rows with no cells).
    pub fn new(rows: usize, cols: usize) -> Option<Self> {
        if rows == 0 || cols < 2 {
            return None;
        }

        let mut row_starts = Vec::with_capacity(rows);
        let mut next = 0;
        for row in 0..rows {
            row_starts.push(next);
            next += Self::width_of(cols, row);
        }

        let mut grid = Self {
            rows,
            cols,
            row_starts,
            adjacency: Vec::new(),
        };
        grid.adjacency = (0..grid.len())
            .map(|index| {
                let coord = grid.coord_of(index);
                coord
                    .neighbor_candidates()
                    .into_iter()
                    .filter_map(|(r, c)| grid.index_of_signed(r, c))
                    .collect()
            })
            .collect();

        Some(grid)
    }

    fn width_of(cols: usize, row: usize) -> usize {
        if row % 2 == 0 {
            cols
        } else {
            cols - 1
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of cells on the even (long) rows
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells in a given row
    pub fn row_width(&self, row: usize) -> usize {
        Self::width_of(self.cols, row)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        let last = self.rows - 1;
        self.row_starts[last] + self.row_width(last)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major index of a coordinate, if it lies on the board
    pub fn index_of(&self, coord: HexCoord) -> Option<usize> {
        if coord.row >= self.rows || coord.col >= self.row_width(coord.row) {
            return None;
        }
        Some(self.row_starts[coord.row] + coord.col)
    }

    fn index_of_signed(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 {
            return None;
        }
        self.index_of(HexCoord::new(row as usize, col as usize))
    }

    /// Coordinate of a row-major index.
    ///
    /// Panics if `index` is out of range.
    pub fn coord_of(&self, index: usize) -> HexCoord {
        let row = match self.row_starts.binary_search(&index) {
            Ok(row) => row,
            Err(next) => next - 1,
        };
        HexCoord::new(row, index - self.row_starts[row])
    }

    /// Neighbors of a cell, in a fixed order
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    /// Whether two cells share an edge
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|neighbors| neighbors.contains(&b))
    }
}
