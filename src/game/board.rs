use serde::{Deserialize, Serialize};

const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

pub const CELL_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cell {
    #[default]
    Empty,
    Player,
    Opponent,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Player => 'X',
            Cell::Opponent => 'O',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    PlayerWin,
    OpponentWin,
    Draw,
}

impl Outcome {
    pub fn message(self) -> &'static str {
        match self {
            Outcome::PlayerWin => "You Win!",
            Outcome::OpponentWin => "Computer Wins!",
            Outcome::Draw => "Draw!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn is_empty_at(&self, index: usize) -> bool {
        self.get(index) == Some(Cell::Empty)
    }

    pub fn place(&mut self, index: usize, mark: Cell) {
        self.cells[index] = mark;
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(index, _)| index)
    }

    pub fn has_won(&self, mark: Cell) -> bool {
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == mark))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| *cell != Cell::Empty)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if self.has_won(Cell::Player) {
            Some(Outcome::PlayerWin)
        } else if self.has_won(Cell::Opponent) {
            Some(Outcome::OpponentWin)
        } else if self.is_full() {
            Some(Outcome::Draw)
        } else {
            None
        }
    }

    /// Best reply for the opponent by exhaustive minimax. The first cell with
    /// the top score wins ties. `None` on a full board.
    pub fn best_move(&self) -> Option<usize> {
        let mut scratch = *self;
        let mut best: Option<(usize, i32)> = None;
        for index in self.empty_cells() {
            scratch.cells[index] = Cell::Opponent;
            let score = minimax(&mut scratch, 0, false);
            scratch.cells[index] = Cell::Empty;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Three text rows, `X`/`O`/`.` per cell.
    pub fn render_rows(&self) -> [String; 3] {
        let row = |r: usize| {
            self.cells[r * 3..r * 3 + 3]
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    other => other.symbol(),
                })
                .collect::<String>()
        };
        [row(0), row(1), row(2)]
    }
}

fn minimax(board: &mut Board, depth: i32, maximizing: bool) -> i32 {
    if board.has_won(Cell::Opponent) {
        return 10 - depth;
    }
    if board.has_won(Cell::Player) {
        return depth - 10;
    }
    if board.is_full() {
        return 0;
    }

    let (mark, mut best) = if maximizing {
        (Cell::Opponent, i32::MIN)
    } else {
        (Cell::Player, i32::MAX)
    };

    for index in 0..CELL_COUNT {
        if board.cells[index] != Cell::Empty {
            continue;
        }
        board.cells[index] = mark;
        let score = minimax(board, depth + 1, !maximizing);
        board.cells[index] = Cell::Empty;
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(layout: &str) -> Board {
        let mut board = Board::new();
        for (index, ch) in layout.chars().filter(|c| !c.is_whitespace()).enumerate() {
            let mark = match ch {
                'X' => Cell::Player,
                'O' => Cell::Opponent,
                _ => Cell::Empty,
            };
            board.place(index, mark);
        }
        board
    }

    #[test]
    fn detects_every_line() {
        for line in WIN_LINES {
            let mut b = Board::new();
            for i in line {
                b.place(i, Cell::Player);
            }
            assert_eq!(b.outcome(), Some(Outcome::PlayerWin));
        }
    }

    #[test]
    fn full_board_without_line_is_draw() {
        let b = board("XOX XOO OXX");
        assert_eq!(b.outcome(), Some(Outcome::Draw));
        assert_eq!(b.best_move(), None);
    }

    #[test]
    fn takes_the_win() {
        let b = board("OO. XX. X..");
        assert_eq!(b.best_move(), Some(2));
    }

    #[test]
    fn blocks_the_threat() {
        let b = board("XX. .O. ...");
        assert_eq!(b.best_move(), Some(2));
    }

    #[test]
    fn answers_corner_opening_with_center() {
        let b = board("X.. ... ...");
        assert_eq!(b.best_move(), Some(4));
    }

    #[test]
    fn renders_rows() {
        let b = board("XO. ... ..X");
        assert_eq!(b.render_rows(), ["XO.".to_string(), "...".into(), "..X".into()]);
    }

    /// Walk every line of play where the player moves first and the opponent
    /// answers with `best_move`. The opponent must never lose.
    #[test]
    fn opponent_never_loses_playing_second() {
        fn explore(board: Board, games: &mut usize) {
            for index in board.empty_cells().collect::<Vec<_>>() {
                let mut next = board;
                next.place(index, Cell::Player);
                match next.outcome() {
                    Some(Outcome::PlayerWin) => panic!("player won: {:?}", next.render_rows()),
                    Some(_) => {
                        *games += 1;
                        continue;
                    }
                    None => {}
                }
                let reply = next.best_move().expect("board has room");
                next.place(reply, Cell::Opponent);
                match next.outcome() {
                    Some(Outcome::PlayerWin) => unreachable!(),
                    Some(_) => *games += 1,
                    None => explore(next, games),
                }
            }
        }

        let mut games = 0;
        explore(Board::new(), &mut games);
        assert!(games > 0);
    }
}
