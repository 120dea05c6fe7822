//! Game rules for tic-tac-toe.
//!
//! Pure functions evaluating a board. Kept apart from board storage so the
//! outcome scan can be tested in isolation.

mod draw;
mod win;

pub use draw::is_full;
pub use win::check_winner;
