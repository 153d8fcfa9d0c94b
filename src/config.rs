use std::time::Duration;

use clap::Parser;

/// Snake on a 10x10 board. Steer with w/a/s/d or the arrow keys, quit with q.
///
/// Logs go to stderr and are controlled by RUST_LOG, redirect them when enabling
/// (e.g. `RUST_LOG=debug gridsnake 2> snake.log`).
#[derive(Debug, Clone, Parser)]
#[command(name = "gridsnake")]
#[command(version, about)]
pub struct Config {
    /// Milliseconds between two steps of the snake
    #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Seed for food placement, random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Config::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["gridsnake"]).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(150));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn custom_values() {
        let config =
            Config::try_parse_from(["gridsnake", "--tick-ms", "200", "--seed", "42"]).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(200));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(Config::try_parse_from(["gridsnake", "--tick-ms", "0"]).is_err());
    }
}
