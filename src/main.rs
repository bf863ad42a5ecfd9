mod cli;
mod commands;

use clap::Parser;
use dotenv::dotenv;

use cli::{BacktestCliConfig, Cli, Commands, DataSource, ExecutionMode};
use crossover_trader::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Trade {
            strategy,
            duration,
            history_limit,
            timeframe,
            live,
            dry_run,
            trades_file,
            autostart,
        } => {
            let config = strategy.trading_config(duration, history_limit, timeframe);
            let mode = ExecutionMode::from_flags(live, dry_run);
            let trades_file = trades_file.unwrap_or_else(|| mode.journal_file());
            commands::run_trade(config, mode, trades_file, autostart).await?;
        }
        Commands::Backtest {
            strategy,
            csv,
            synthetic,
            bars,
            start,
            end,
            output_dir,
        } => {
            let source =
                DataSource::from_args(csv, synthetic, bars, start.as_deref(), end.as_deref())?;
            let config = BacktestCliConfig {
                symbol: strategy.symbol.clone(),
                short_window: strategy.short_window,
                long_window: strategy.long_window,
                backtest: strategy.backtest_config(),
                source,
                output_dir,
            };
            commands::run_backtest(config).await?;
        }
    }

    Ok(())
}
