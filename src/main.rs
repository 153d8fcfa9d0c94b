use clap::Parser;
use color_eyre::Result;
use gridsnake::config::Config;
use gridsnake::snake::SnakeEngine;
use gridsnake::terminal::TerminalSession;

fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();

    let config = Config::parse();
    let engine = match config.seed {
        Some(seed) => SnakeEngine::from_seed(seed),
        None => SnakeEngine::from_entropy(),
    };
    let mut session = TerminalSession::new(engine, config.tick_interval());
    session.play()
}
