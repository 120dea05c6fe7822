//! Draw detection logic for tic-tac-toe.

use crate::Cell;
use tracing::instrument;

/// Checks if every cell is occupied.
///
/// A full board with no winner is a draw.
#[instrument]
pub fn is_full(cells: &[[Cell; 3]; 3]) -> bool {
    cells.iter().flatten().all(|cell| *cell != Cell::Empty)
}
