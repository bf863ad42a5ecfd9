//! CLI argument parsing using clap.

mod config;

pub use config::{BacktestCliConfig, DataSource, ExecutionMode};

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use crossover_trader::exchange::Granularity;

/// Moving average crossover trader for a single US equity
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Strategy parameters shared by both commands.
#[derive(clap::Args, Debug, Clone)]
pub struct StrategyArgs {
    /// The symbol to trade (e.g., "AAPL")
    #[arg(short, long, default_value = "AAPL")]
    pub symbol: String,
    /// Short moving average window
    #[arg(long, default_value_t = 40)]
    pub short_window: usize,
    /// Long moving average window
    #[arg(long, default_value_t = 100)]
    pub long_window: usize,
    /// Starting capital in USD
    #[arg(long, default_value = "100000")]
    pub initial_capital: Decimal,
    /// Proportional cost per trade (0.001 = 0.1%)
    #[arg(long, default_value = "0.001")]
    pub transaction_cost: Decimal,
    /// Fraction of capital committed per entry
    #[arg(long, default_value = "0.02")]
    pub risk_fraction: Decimal,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the live trading loop with an interactive console
    Trade {
        #[command(flatten)]
        strategy: StrategyArgs,
        /// Seconds to wait between trade cycles
        #[arg(short, long, default_value_t = 60)]
        duration: u64,
        /// Bars fetched per cycle
        #[arg(long, default_value_t = 200)]
        history_limit: usize,
        /// Bar timeframe (1Min, 5Min, 15Min, 1Hour, 1Day)
        #[arg(long, default_value = "1Min")]
        timeframe: Granularity,
        /// Send orders to the Alpaca live endpoint (real money). Paper otherwise
        #[arg(long, default_value_t = false)]
        live: bool,
        /// Fill orders locally; only market data touches the network
        #[arg(long, default_value_t = false, conflicts_with = "live")]
        dry_run: bool,
        /// Trade journal path [default: live_trades.csv with --live, paper_trades.csv otherwise]
        #[arg(long)]
        trades_file: Option<PathBuf>,
        /// Start trading immediately instead of waiting for `start`
        #[arg(long, default_value_t = false)]
        autostart: bool,
    },

    /// Run a backtest on historical data
    Backtest {
        #[command(flatten)]
        strategy: StrategyArgs,
        /// CSV file with timestamp and close columns
        #[arg(long, conflicts_with_all = ["synthetic", "start"])]
        csv: Option<PathBuf>,
        /// Use a deterministic synthetic series (no files or network)
        #[arg(long, default_value_t = false)]
        synthetic: bool,
        /// Number of synthetic bars
        #[arg(long, default_value_t = 1000)]
        bars: usize,
        /// Alpaca daily bars from this date (YYYY-MM-DD or RFC 3339)
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Alpaca daily bars up to this date
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Output directory for results
        #[arg(long, default_value = "backtest_results")]
        output_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade_flags(args: &[&str]) -> (bool, bool, Option<PathBuf>) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Trade {
                live,
                dry_run,
                trades_file,
                ..
            } => (live, dry_run, trades_file),
            _ => panic!("expected trade command"),
        }
    }

    #[test]
    fn test_trade_defaults_to_paper() {
        let (live, dry_run, trades_file) = trade_flags(&["crossover-trader", "trade"]);
        assert!(!live);
        assert!(!dry_run);
        assert!(trades_file.is_none());
        assert_eq!(
            ExecutionMode::from_flags(live, dry_run),
            ExecutionMode::Paper
        );
    }

    #[test]
    fn test_live_requires_explicit_flag() {
        let (live, dry_run, _) = trade_flags(&["crossover-trader", "trade", "--live"]);
        assert_eq!(ExecutionMode::from_flags(live, dry_run), ExecutionMode::Live);

        assert!(
            Cli::try_parse_from(["crossover-trader", "trade", "--live", "--dry-run"]).is_err()
        );
    }
}
