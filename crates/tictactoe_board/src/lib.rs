//! Pure tic-tac-toe game logic.
//!
//! A [`Board`] knows cells, placements and outcomes. It has no notion of
//! players, turns or connections; those live in the server crate.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod rules;
mod types;

pub use board::{Board, SIZE};
pub use types::{Cell, Outcome, Side};
