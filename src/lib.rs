pub mod config;
pub mod grid;
pub mod snake;
pub mod terminal;
