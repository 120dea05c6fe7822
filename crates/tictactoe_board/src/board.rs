//! The 3x3 board state machine.

use crate::rules::{check_winner, is_full};
use crate::{Cell, Outcome, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Board edge length.
pub const SIZE: usize = 3;

/// 3x3 tic-tac-toe board.
///
/// Cells only ever go from `Empty` to `Occupied`. The single other piece of
/// state is the side that walked away, which turns the outcome into a win for
/// its opponent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    /// Cells in row-major order.
    cells: [[Cell; SIZE]; SIZE],
    /// Side that forfeited by leaving an unfinished game.
    forfeited: Option<Side>,
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cell at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Returns all cells, row-major.
    pub fn cells(&self) -> &[[Cell; SIZE]; SIZE] {
        &self.cells
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    /// Places `side` at `(row, col)`.
    ///
    /// Returns `false` and leaves the board untouched when the coordinates
    /// are out of range, the cell is taken, or the game is already decided.
    /// Whose turn it is belongs to the caller.
    #[instrument(level = "trace", skip(self))]
    pub fn apply_move(&mut self, row: usize, col: usize, side: Side) -> bool {
        match self.get(row, col) {
            None => {
                debug!(row, col, "Move out of bounds");
                false
            }
            Some(Cell::Occupied(owner)) => {
                debug!(row, col, %owner, "Cell already occupied");
                false
            }
            Some(Cell::Empty) if self.outcome().is_terminal() => {
                debug!(row, col, outcome = %self.outcome(), "Board already decided");
                false
            }
            Some(Cell::Empty) => {
                self.cells[row][col] = Cell::Occupied(side);
                true
            }
        }
    }

    /// Scans the winning lines, then checks for a full board.
    pub fn outcome(&self) -> Outcome {
        if let Some(loser) = self.forfeited {
            return Outcome::Win(loser.opponent());
        }
        match check_winner(&self.cells) {
            Some(side) => Outcome::Win(side),
            None if is_full(&self.cells) => Outcome::Draw,
            None => Outcome::Ongoing,
        }
    }

    /// Records `side` walking away from the game.
    ///
    /// An undecided game becomes a win for the opponent. A decided game keeps
    /// its outcome, so repeated calls return the same value.
    #[instrument(level = "trace", skip(self))]
    pub fn leave(&mut self, side: Side) -> Outcome {
        let current = self.outcome();
        if current.is_terminal() {
            return current;
        }
        self.forfeited = Some(side);
        self.outcome()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (r, row) in self.cells.iter().enumerate() {
            let symbols: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => " ".to_string(),
                    Cell::Occupied(side) => side.to_string(),
                })
                .collect();
            write!(f, "{}", symbols.join("|"))?;
            if r + 1 < SIZE {
                write!(f, "\n-+-+-\n")?;
            }
        }
        Ok(())
    }
}
