//! Win detection logic for tic-tac-toe.

use crate::{Cell, Side};
use tracing::instrument;

/// The eight winning lines as `(row, col)` triples.
pub const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Checks if some side holds all three cells of a line.
///
/// Returns `Some(side)` for the first completed line found, `None`
/// otherwise.
#[instrument]
pub fn check_winner(cells: &[[Cell; 3]; 3]) -> Option<Side> {
    for [a, b, c] in LINES {
        let first = cells[a.0][a.1];
        if first != Cell::Empty && first == cells[b.0][b.1] && first == cells[c.0][c.1] {
            return first.side();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn with(cells: &[(usize, usize)], side: Side) -> [[Cell; 3]; 3] {
        let mut grid = [[Cell::Empty; 3]; 3];
        for &(r, c) in cells {
            grid[r][c] = Cell::Occupied(side);
        }
        grid
    }

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(check_winner(&[[Cell::Empty; 3]; 3]), None);
    }

    #[test]
    fn test_every_line_wins() {
        for line in LINES {
            for side in Side::iter() {
                assert_eq!(check_winner(&with(&line, side)), Some(side), "{line:?}");
            }
        }
    }

    #[test]
    fn test_mixed_line_does_not_win() {
        let mut grid = with(&[(0, 0), (0, 1)], Side::X);
        grid[0][2] = Cell::Occupied(Side::O);
        assert_eq!(check_winner(&grid), None);
    }

    #[test]
    fn test_no_winner_incomplete() {
        assert_eq!(check_winner(&with(&[(2, 0), (1, 1)], Side::O)), None);
    }
}
