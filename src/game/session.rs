use anyhow::{bail, Result};

use super::board::{Board, Cell, Outcome, CELL_COUNT};

/// One game of tic-tac-toe. The player always moves first.
#[derive(Debug, Clone, Default)]
pub struct GameSession {
    board: Board,
    outcome: Option<Outcome>,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn player_move(&mut self, index: usize) -> Result<Option<Outcome>> {
        if self.is_over() {
            bail!("game is over");
        }
        if index >= CELL_COUNT {
            bail!("cell {index} is off the board");
        }
        if !self.board.is_empty_at(index) {
            bail!("cell {index} is taken");
        }
        self.board.place(index, Cell::Player);
        self.outcome = self.board.outcome();
        Ok(self.outcome)
    }

    /// Plays the minimax reply. Returns the cell taken (if any) and the
    /// outcome it produced.
    pub fn opponent_move(&mut self) -> (Option<usize>, Option<Outcome>) {
        if self.is_over() {
            return (None, self.outcome);
        }
        let Some(index) = self.board.best_move() else {
            return (None, self.outcome);
        };
        self.board.place(index, Cell::Opponent);
        self.outcome = self.board.outcome();
        (Some(index), self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_illegal_moves() {
        let mut game = GameSession::new();
        assert!(game.player_move(9).is_err());
        game.player_move(0).unwrap();
        assert!(game.player_move(0).is_err());
    }

    #[test]
    fn opponent_replies_and_game_ends() {
        let mut game = GameSession::new();
        let mut moves = 0;
        while !game.is_over() {
            let free = game.board().empty_cells().next().unwrap();
            if game.player_move(free).unwrap().is_some() {
                break;
            }
            let (cell, _) = game.opponent_move();
            assert!(cell.is_some());
            moves += 1;
        }
        assert!(moves > 0);
        assert_ne!(game.outcome(), Some(Outcome::PlayerWin));
        assert!(game.player_move(0).is_err());
        assert_eq!(game.opponent_move().0, None);
    }
}
