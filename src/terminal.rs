// terminal front end: stdin is read byte by byte on its own thread, keys are queued
// in a bounded buffer and at most one turn is applied per tick, so two quick presses
// can never fold the snake back onto itself within a single step
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use circular_buffer::CircularBuffer;
use color_eyre::eyre::{Result, WrapErr};
use colored::Colorize;
use log::{error, info};
use termios::{tcflag_t, tcsetattr, Termios, ECHO, ICANON, ISIG, TCSANOW};

use crate::grid::Direction;
use crate::snake::{CellKind, GameOverReason, SnakeEngine, TickOutcome};

type InputBuffer = CircularBuffer<1024, u8>; // 1024 bytes in input buffer

const STDIN_FD: i32 = 0;
const POLL_INTERVAL: Duration = Duration::from_millis(3);

// arrow keys are 3 bytes long: ESC [ and a letter from A to D
const ESC: u8 = 27;
const CSI: u8 = b'[';
const QUIT: u8 = b'q';
const CTRL_C: u8 = 3; // arrives as a byte once ISIG is off

fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    write!(out, "{}[2J{}[1;1H", ESC as char, ESC as char)
}

/// Local modes of the game: no line buffering, no echo and no signals from Ctrl-C,
/// so that quitting always goes through the loop and restores the terminal.
fn raw_local_modes(flags: tcflag_t) -> tcflag_t {
    flags & !(ICANON | ECHO | ISIG)
}

/// Raw stdin for as long as the value lives.
struct RawMode {
    original: Termios,
}

impl RawMode {
    fn enable() -> Result<RawMode> {
        let original = Termios::from_fd(STDIN_FD).wrap_err("stdin is not a terminal")?;
        let mut raw = original;
        raw.c_lflag = raw_local_modes(raw.c_lflag);
        tcsetattr(STDIN_FD, TCSANOW, &raw).wrap_err("failed to switch stdin to raw mode")?;
        Ok(RawMode { original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = tcsetattr(STDIN_FD, TCSANOW, &self.original) {
            error!("failed to restore terminal settings: {err}");
        }
    }
}

fn spawn_stdin_channel() -> Receiver<u8> {
    let (tx, rx) = mpsc::channel::<u8>();
    thread::spawn(move || {
        let mut reader = io::stdin();
        let mut buffer = [0u8; 1];
        // ends on EOF or once the game loop is gone
        while reader.read_exact(&mut buffer).is_ok() {
            if tx.send(buffer[0]).is_err() {
                break;
            }
        }
    });
    rx
}

fn is_steering_byte(key: u8) -> bool {
    matches!(key, ESC | CSI | b'A'..=b'D' | b'w' | b'a' | b's' | b'd')
}

/// Pops bytes off the front of the buffer until one full direction key is read.
/// An arrow sequence that has not fully arrived yet (`ESC` or `ESC [`) is left in place.
fn take_direction(buffer: &mut InputBuffer) -> Option<Direction> {
    while let Some(&key) = buffer.front() {
        let direction = match key {
            b'w' => Some(Direction::Up),
            b'd' => Some(Direction::Right),
            b's' => Some(Direction::Down),
            b'a' => Some(Direction::Left),
            ESC => {
                let arrow = match (buffer.nth_front(1), buffer.nth_front(2)) {
                    // rest of the sequence still on its way
                    (None, _) | (Some(&CSI), None) => return None,
                    (Some(&CSI), Some(&b'A')) => Some(Direction::Up),
                    (Some(&CSI), Some(&b'B')) => Some(Direction::Down),
                    (Some(&CSI), Some(&b'C')) => Some(Direction::Right),
                    (Some(&CSI), Some(&b'D')) => Some(Direction::Left),
                    _ => None, // lone Esc press
                };
                if arrow.is_some() {
                    buffer.pop_front();
                    buffer.pop_front();
                }
                arrow
            }
            _ => None, // stray part of an escape sequence
        };
        buffer.pop_front();
        if direction.is_some() {
            return direction;
        }
    }
    None
}

fn describe(reason: GameOverReason) -> &'static str {
    match reason {
        GameOverReason::Wall => "hit the wall",
        GameOverReason::SelfCollision => "bit itself",
    }
}

pub struct TerminalSession {
    engine: SnakeEngine,
    tick_interval: Duration,
    input_buffer: InputBuffer,
    best_score: u32,
    last_game_over: Option<(GameOverReason, u32)>,
}

impl TerminalSession {
    pub fn new(engine: SnakeEngine, tick_interval: Duration) -> TerminalSession {
        TerminalSession {
            engine,
            tick_interval,
            input_buffer: InputBuffer::new(),
            best_score: 0,
            last_game_over: None,
        }
    }

    /// Runs the game loop until `q` or Ctrl-C is pressed, or stdin is closed.
    pub fn play(&mut self) -> Result<()> {
        let _raw_mode = RawMode::enable()?;
        let stdin_channel = spawn_stdin_channel();
        info!("session started, one step every {:?}", self.tick_interval);

        self.draw()?;
        let mut frame_start_time = Instant::now();
        loop {
            loop {
                match stdin_channel.try_recv() {
                    Ok(QUIT | CTRL_C) => {
                        info!("quit requested, best score {}", self.best_score);
                        return Ok(());
                    }
                    Ok(key) => self.add_to_input_buffer(key),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("stdin was closed, best score {}", self.best_score);
                        return Ok(());
                    }
                }
            }
            if frame_start_time.elapsed() < self.tick_interval {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            frame_start_time = Instant::now();
            self.step();
            self.draw()?;
        }
    }

    fn add_to_input_buffer(&mut self, key: u8) {
        // if the buffer is full, ignore the input
        if is_steering_byte(key) && !self.input_buffer.is_full() {
            self.input_buffer.push_back(key);
        }
    }

    fn step(&mut self) {
        if let Some(direction) = take_direction(&mut self.input_buffer) {
            self.engine.set_direction(direction);
        }
        let score_before = self.engine.score();
        match self.engine.tick() {
            TickOutcome::GameOver(reason) => {
                self.last_game_over = Some((reason, score_before));
                // stale keys belong to the previous game
                self.input_buffer.clear();
            }
            TickOutcome::Ate { .. } => {
                self.best_score = self.best_score.max(self.engine.score());
            }
            TickOutcome::Moved => {}
        }
    }

    fn draw(&self) -> Result<()> {
        let mut out = io::stdout().lock();
        clear_screen(&mut out)?;
        self.display_board(&mut out)?;
        out.flush().wrap_err("failed to draw the board")
    }

    fn display_board(&self, out: &mut impl Write) -> io::Result<()> {
        let grid = self.engine.grid();
        let head = self.engine.snake().head().cell;
        let border = "▄▄".repeat(grid.size());
        writeln!(out, "▗{border}▖")?;
        for row in grid.rows() {
            write!(out, "▐")?;
            for &cell in row {
                match self.engine.cell_kind(cell) {
                    CellKind::Plain => write!(out, "  ")?,
                    CellKind::Snake if cell == head => write!(out, "{}", "Ӫ ".yellow())?,
                    CellKind::Snake => write!(out, "{}", "⏺ ".green())?,
                    CellKind::Food => write!(out, "{}", "♦ ".red())?,
                }
            }
            writeln!(out, "▌")?;
        }
        writeln!(out, "▝{}▘", "▀▀".repeat(grid.size()))?;
        writeln!(out, "Points: {}   Best: {}", self.engine.score(), self.best_score)?;
        if let Some((reason, score)) = self.last_game_over {
            writeln!(out, "Last game: {} with {} points", describe(reason), score)?;
        }
        writeln!(out, "w/a/s/d or arrows to steer, q to quit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termios::IEXTEN;

    fn buffer_of(bytes: &[u8]) -> InputBuffer {
        let mut buffer = InputBuffer::new();
        buffer.extend(bytes.iter().copied());
        buffer
    }

    #[test]
    fn letter_keys_map_to_directions() {
        let mut buffer = buffer_of(b"wdsa");
        assert_eq!(take_direction(&mut buffer), Some(Direction::Up));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Right));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Down));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Left));
        assert_eq!(take_direction(&mut buffer), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn arrow_sequences_map_to_directions() {
        let mut buffer = buffer_of(&[ESC, CSI, b'A', ESC, CSI, b'B', ESC, CSI, b'C', ESC, CSI, b'D']);
        assert_eq!(take_direction(&mut buffer), Some(Direction::Up));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Down));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Right));
        assert_eq!(take_direction(&mut buffer), Some(Direction::Left));
        assert!(buffer.is_empty());
    }

    #[test]
    fn one_direction_per_call() {
        let mut buffer = buffer_of(b"wa");
        assert_eq!(take_direction(&mut buffer), Some(Direction::Up));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn partial_arrow_waits_for_the_rest() {
        let mut buffer = buffer_of(&[ESC, CSI]);
        assert_eq!(take_direction(&mut buffer), None);
        assert_eq!(buffer.len(), 2);
        buffer.push_back(b'C');
        assert_eq!(take_direction(&mut buffer), Some(Direction::Right));
    }

    #[test]
    fn lone_escape_does_not_block_later_keys() {
        let mut buffer = buffer_of(&[ESC, b's']);
        assert_eq!(take_direction(&mut buffer), Some(Direction::Down));
        assert!(buffer.is_empty());
    }

    #[test]
    fn lone_escape_then_turn_is_applied_on_next_step() {
        let mut session = TerminalSession::new(SnakeEngine::from_seed(1), Duration::from_millis(150));
        session.add_to_input_buffer(ESC);
        session.add_to_input_buffer(b's');
        session.step();
        assert_eq!(session.engine.direction(), Direction::Down);
        assert!(session.input_buffer.is_empty());
    }

    #[test]
    fn escape_alone_waits_for_more() {
        let mut buffer = buffer_of(&[ESC]);
        assert_eq!(take_direction(&mut buffer), None);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn raw_mode_turns_off_signals() {
        let flags = raw_local_modes(ICANON | ECHO | ISIG | IEXTEN);
        assert_eq!(flags & (ICANON | ECHO | ISIG), 0);
        assert_eq!(flags & IEXTEN, IEXTEN);
    }

    #[test]
    fn ctrl_c_is_not_a_steering_byte() {
        assert!(!is_steering_byte(CTRL_C));
        assert!(!is_steering_byte(QUIT));
    }

    #[test]
    fn stray_bytes_are_skipped() {
        let mut buffer = buffer_of(&[b'A', CSI, ESC, b'x', b'y', b's']);
        assert_eq!(take_direction(&mut buffer), Some(Direction::Down));
        assert!(buffer.is_empty());
    }

    #[test]
    fn only_steering_bytes_are_buffered() {
        let mut session = TerminalSession::new(SnakeEngine::from_seed(1), Duration::from_millis(150));
        for key in b"wxz1d" {
            session.add_to_input_buffer(*key);
        }
        assert_eq!(session.input_buffer.len(), 2);
    }

    #[test]
    fn step_applies_buffered_turn() {
        let mut session = TerminalSession::new(SnakeEngine::from_seed(1), Duration::from_millis(150));
        session.add_to_input_buffer(b's');
        session.step();
        assert_eq!(session.engine.direction(), Direction::Down);
        assert_eq!(session.engine.snake().head().cell.value(), 64);
    }

    #[test]
    fn game_over_is_remembered() {
        let mut session = TerminalSession::new(SnakeEngine::from_seed(1), Duration::from_millis(150));
        session.add_to_input_buffer(b'w');
        // from row 5 the top wall is six steps away
        for _ in 0..6 {
            session.step();
        }
        assert_eq!(session.last_game_over, Some((GameOverReason::Wall, 0)));
        assert_eq!(session.engine.score(), 0);
    }

    #[test]
    fn board_is_rendered() {
        colored::control::set_override(false);
        let session = TerminalSession::new(SnakeEngine::from_seed(1), Duration::from_millis(150));
        let mut out = Vec::new();
        session.display_board(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 12 + 2);
        // start cell is row 5 col 3, food four cells to the right
        assert_eq!(lines[6], format!("▐{}Ӫ{}♦{}▌", " ".repeat(6), " ".repeat(7), " ".repeat(5)));
        assert!(text.contains("Points: 0"));
    }
}
