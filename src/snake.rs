// snake moves one cell per tick: a new head is pushed at the front and the tail is dropped,
// eating food extends the tail backwards along the tail's own heading.
// direction changes that would reverse the snake onto itself are ignored
use std::collections::HashSet;

use circular_buffer::CircularBuffer;
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::{Cell, Coordinates, Direction, Grid, CELL_COUNT, GRID_SIZE};

// distance (in cell numbers) between the start cell and the first food
const FOOD_START_OFFSET: usize = 4;

type SnakeBody = CircularBuffer<CELL_COUNT, Segment>; // can never be longer than the board

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub position: Coordinates,
    pub cell: Cell,
}

impl Segment {
    pub fn new(position: Coordinates, cell: Cell) -> Segment {
        Segment { position, cell }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Plain,
    Snake,
    Food,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Wall,
    SelfCollision,
}

/// What a single [`SnakeEngine::tick`] did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Moved,
    /// `grew` is false when the cell behind the tail was off the board or taken
    Ate { grew: bool },
    GameOver(GameOverReason),
}

/// Body of the snake, head at the front, plus the set of cells it covers.
///
/// Both are only touched together, so the occupancy set always holds exactly
/// the cells of the segments in `body`.
#[derive(Debug, Clone)]
pub struct Snake {
    body: SnakeBody, // The head is the first element
    occupied: HashSet<Cell>,
}

impl Snake {
    pub fn new(start: Segment) -> Snake {
        let mut body = SnakeBody::new();
        body.push_back(start);
        Snake {
            body,
            occupied: HashSet::from([start.cell]),
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn head(&self) -> &Segment {
        // a snake is built with one segment and never drops below one
        &self.body[0]
    }

    pub fn tail(&self) -> &Segment {
        &self.body[self.body.len() - 1]
    }

    /// Segment right before the tail, going towards the head.
    fn tail_neighbor(&self) -> Option<&Segment> {
        self.body.nth_back(1)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.occupied.contains(&cell)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.body.iter()
    }

    pub fn occupied_cells(&self) -> &HashSet<Cell> {
        &self.occupied
    }

    /// Moves forward by one: `head` becomes the new head and the tail is dropped.
    fn advance(&mut self, head: Segment) {
        // drop the tail first so that the buffer has room even when full
        if let Some(old_tail) = self.body.pop_back() {
            self.occupied.remove(&old_tail.cell);
        }
        self.body.push_front(head);
        self.occupied.insert(head.cell);
    }

    fn extend_tail(&mut self, segment: Segment) -> bool {
        if self.body.is_full() || self.occupied.contains(&segment.cell) {
            return false;
        }
        self.body.push_back(segment);
        self.occupied.insert(segment.cell);
        true
    }
}

pub struct SnakeEngine<R: Rng = StdRng> {
    grid: Grid,
    snake: Snake,
    food: Cell,
    direction: Direction,
    score: u32,
    rng: R,
}

impl SnakeEngine<StdRng> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        let seed: u64 = rand::rng().random();
        debug!("food generator seeded with {seed}");
        Self::from_seed(seed)
    }
}

impl<R: Rng> SnakeEngine<R> {
    pub fn new(rng: R) -> Self {
        let grid = Grid::new();
        let start = start_segment(&grid);
        SnakeEngine {
            grid,
            snake: Snake::new(start),
            food: start.cell.offset(FOOD_START_OFFSET),
            direction: Direction::Right,
            score: 0,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Cell {
        self.food
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn cell_kind(&self, cell: Cell) -> CellKind {
        if self.snake.contains(cell) {
            CellKind::Snake
        } else if cell == self.food {
            CellKind::Food
        } else {
            CellKind::Plain
        }
    }

    /// Requests a new heading for the next tick. Turning straight back is ignored
    /// unless the snake is a single segment.
    pub fn set_direction(&mut self, requested: Direction) {
        if self.snake.len() > 1 && self.direction.is_opposite(requested) {
            trace!("ignoring reversal from {:?} to {:?}", self.direction, requested);
            return;
        }
        self.direction = requested;
    }

    /// Advances the game by one step.
    pub fn tick(&mut self) -> TickOutcome {
        let next_position = self.snake.head().position.neighbor(self.direction);
        let Some(next_cell) = self.grid.cell_at(&next_position) else {
            return self.game_over(GameOverReason::Wall);
        };
        if self.snake.contains(next_cell) {
            return self.game_over(GameOverReason::SelfCollision);
        }

        self.snake.advance(Segment::new(next_position, next_cell));
        if next_cell != self.food {
            return TickOutcome::Moved;
        }

        let grew = self.grow();
        self.generate_food();
        self.score += 1;
        debug!("food eaten at {next_cell}, score {}, length {}", self.score, self.snake.len());
        TickOutcome::Ate { grew }
    }

    /// Adds a segment behind the tail, opposite to the direction the tail is heading.
    fn grow(&mut self) -> bool {
        let tail = *self.snake.tail();
        let tail_heading = self
            .snake
            .tail_neighbor()
            .and_then(|neighbor| tail.position.direction_to(&neighbor.position))
            .unwrap_or(self.direction);
        let growth_position = tail.position.neighbor(tail_heading.opposite());

        let Some(growth_cell) = self.grid.cell_at(&growth_position) else {
            debug!("no room behind the tail at {}, not growing", tail.cell);
            return false;
        };
        let grew = self.snake.extend_tail(Segment::new(growth_position, growth_cell));
        if !grew {
            debug!("cell {growth_cell} behind the tail is taken, not growing");
        }
        grew
    }

    // rejection sampling: never terminates if the snake covers the whole board
    fn generate_food(&mut self) {
        let previous_food = self.food;
        loop {
            let candidate = Cell(self.rng.random_range(1..=CELL_COUNT));
            if candidate != previous_food && !self.snake.contains(candidate) {
                trace!("new food at {candidate}");
                self.food = candidate;
                return;
            }
        }
    }

    fn game_over(&mut self, reason: GameOverReason) -> TickOutcome {
        info!(
            "game over ({:?}) with score {} and length {}",
            reason,
            self.score,
            self.snake.len()
        );
        let start = start_segment(&self.grid);
        self.snake = Snake::new(start);
        self.food = start.cell.offset(FOOD_START_OFFSET);
        self.direction = Direction::Right;
        self.score = 0;
        TickOutcome::GameOver(reason)
    }
}

fn start_segment(grid: &Grid) -> Segment {
    let size = GRID_SIZE as f64;
    let position = Coordinates::new((size / 2.0).round() as i32, (size / 3.0).round() as i32);
    // the start position is computed from the board size and always lies on it
    let cell = grid.cell_at(&position).unwrap_or(Cell(1));
    Segment::new(position, cell)
}
