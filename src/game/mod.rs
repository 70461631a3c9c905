//! Tic-tac-toe played on the overlay while the cooldown runs.

pub mod board;
pub mod session;

pub use board::{Board, Cell, Outcome, CELL_COUNT};
pub use session::GameSession;
