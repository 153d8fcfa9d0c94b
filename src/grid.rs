// the board is a fixed square of numbered cells, counted row by row starting from 1
use num::Integer;
use std::fmt;

pub const GRID_SIZE: usize = 10;
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Numeric identifier of a single board position, always in `1..=CELL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell(pub(crate) usize);

impl Cell {
    pub fn new(value: usize) -> Option<Cell> {
        (1..=CELL_COUNT).contains(&value).then_some(Cell(value))
    }

    pub fn value(self) -> usize {
        self.0
    }

    /// Cell `offset` places further along the numbering, wrapping past the last cell.
    pub fn offset(self, offset: usize) -> Cell {
        Cell((self.0 - 1 + offset) % CELL_COUNT + 1)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// (row, col) delta of a single step
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

/// Signed board position, so that a step past the border can still be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub row: i32,
    pub col: i32,
}

impl Coordinates {
    pub fn new(row: i32, col: i32) -> Coordinates {
        Coordinates { row, col }
    }

    pub fn neighbor(&self, direction: Direction) -> Coordinates {
        let (d_row, d_col) = direction.delta();
        Coordinates::new(self.row + d_row, self.col + d_col)
    }

    /// Direction leading from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(&self, other: &Coordinates) -> Option<Direction> {
        match (other.row - self.row, other.col - self.col) {
            (0, 1) => Some(Direction::Right),
            (0, -1) => Some(Direction::Left),
            (1, 0) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Up),
            _ => None,
        }
    }
}

/// Immutable numbering of the board, built once.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Grid {
        let mut cells = [[Cell(0); GRID_SIZE]; GRID_SIZE];
        let mut counter = 1;
        for row in cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell = Cell(counter);
                counter += 1;
            }
        }
        Grid { cells }
    }

    pub fn size(&self) -> usize {
        GRID_SIZE
    }

    pub fn is_in_bound(&self, position: &Coordinates) -> bool {
        let size = GRID_SIZE as i32;
        position.row >= 0 && position.row < size && position.col >= 0 && position.col < size
    }

    pub fn cell_at(&self, position: &Coordinates) -> Option<Cell> {
        if !self.is_in_bound(position) {
            return None;
        }
        Some(self.cells[position.row as usize][position.col as usize])
    }

    pub fn coordinates_of(&self, cell: Cell) -> Coordinates {
        let (row, col) = (cell.0 - 1).div_rem(&GRID_SIZE);
        Coordinates::new(row as i32, col as i32)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell; GRID_SIZE]> {
        self.cells.iter()
    }
}
