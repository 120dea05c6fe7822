//! Core domain types for tic-tac-toe.

use serde::{Deserialize, Serialize};

/// Game marker owned by one participant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Side X (moves first).
    #[strum(serialize = "X")]
    X,
    /// Side O (moves second).
    #[strum(serialize = "O")]
    O,
}

impl Side {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::X => Side::O,
            Side::O => Side::X,
        }
    }
}

/// A single cell of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Cell claimed by a side.
    Occupied(Side),
}

impl Cell {
    /// Returns the occupying side, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(side) => Some(side),
        }
    }
}

/// Classification of a board, terminal or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Outcome {
    /// No winner yet and free cells remain.
    #[display("ongoing")]
    Ongoing,
    /// Board is full with no three-in-a-row.
    #[display("draw")]
    Draw,
    /// Side won, either by a line or by forfeit.
    #[display("win({_0})")]
    Win(Side),
}

impl Outcome {
    /// True for `Draw` and `Win`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    /// Returns the winner if there is one.
    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::Win(side) => Some(side),
            Outcome::Ongoing | Outcome::Draw => None,
        }
    }
}
