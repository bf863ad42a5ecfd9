//! Backtest command handler.
//!
//! Loads bars from a CSV file, a synthetic generator or Alpaca, replays the
//! crossover strategy over them and writes `results.json` plus the
//! portfolio trajectory as `portfolio.csv`.

use crossover_trader::backtest::{self, data, BacktestResult};
use crossover_trader::exchange::{AlpacaClient, MarketDataSource};
use crossover_trader::strategy::MovingAverageCrossover;
use crossover_trader::types::BarSeries;

use rust_decimal_macros::dec;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{BacktestCliConfig, DataSource};

/// Backtest results in JSON-serializable format.
#[derive(Debug, Serialize)]
struct BacktestOutput {
    symbol: String,
    short_window: usize,
    long_window: usize,
    bars: usize,
    initial_capital: String,
    final_capital: String,
    final_position: u64,
    final_value: String,
    net_profit: String,
    return_pct: String,
    total_trades: u32,
    winning_trades: u32,
    losing_trades: u32,
    win_rate_pct: String,
    max_drawdown_pct: String,
}

/// Run a backtest with the provided CLI configuration.
///
/// # Errors
/// Returns error if data loading, the simulation or writing results fails.
pub async fn run_backtest(config: BacktestCliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("--- Running Backtest ---");
    info!(
        symbol = %config.symbol,
        short_window = config.short_window,
        long_window = config.long_window,
        source = ?config.source,
        "Backtest configuration"
    );

    let bars = load_bars(&config.symbol, &config.source).await?;
    info!(rows = bars.len(), "Data loaded");

    let strategy = MovingAverageCrossover::new(config.short_window, config.long_window)?;
    let result = backtest::run(&strategy, &bars, &config.backtest)?;

    info!("--- Backtest Results ---");
    info!("Initial Capital: ${}", result.initial_capital);
    info!("Final Capital:   ${}", result.final_capital);
    info!("Final Position:  {} shares", result.final_position);
    info!("Final Value:     ${}", result.final_value);
    info!("Net Profit:      ${}", result.net_profit);
    info!("Return:          {}%", result.return_percentage().round_dp(4));
    info!("Total Trades:    {}", result.total_trades);
    info!("Winning Trades:  {}", result.winning_trades);
    info!("Losing Trades:   {}", result.losing_trades);
    info!("Win Rate:        {}%", (result.win_rate() * dec!(100)).round_dp(2));
    info!("Max Drawdown:    {}%", (result.max_drawdown * dec!(100)).round_dp(4));
    info!("------------------------");

    let paths = write_results(&config, &bars, &result)?;
    for path in paths {
        info!(path = %path.display(), "Results written");
    }

    Ok(())
}

async fn load_bars(
    symbol: &str,
    source: &DataSource,
) -> Result<BarSeries, Box<dyn std::error::Error>> {
    let bars = match source {
        DataSource::Csv(path) => data::load_csv(path)?,
        DataSource::Synthetic { bars } => data::synthetic_series(symbol, *bars),
        DataSource::Alpaca { start, end } => {
            let client = AlpacaClient::from_env(true)?;
            client.fetch_historical_bars(symbol, *start, *end).await?
        }
    };
    Ok(bars)
}

/// Write `results.json` and `portfolio.csv` into the output directory.
fn write_results(
    config: &BacktestCliConfig,
    bars: &BarSeries,
    result: &BacktestResult,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(&config.output_dir)?;

    let output = BacktestOutput {
        symbol: config.symbol.clone(),
        short_window: config.short_window,
        long_window: config.long_window,
        bars: bars.len(),
        initial_capital: result.initial_capital.to_string(),
        final_capital: result.final_capital.to_string(),
        final_position: result.final_position,
        final_value: result.final_value.to_string(),
        net_profit: result.net_profit.to_string(),
        return_pct: result.return_percentage().to_string(),
        total_trades: result.total_trades,
        winning_trades: result.winning_trades,
        losing_trades: result.losing_trades,
        win_rate_pct: (result.win_rate() * dec!(100)).to_string(),
        max_drawdown_pct: (result.max_drawdown * dec!(100)).to_string(),
    };
    let json_path = config.output_dir.join("results.json");
    let mut file = File::create(&json_path)?;
    let json = serde_json::to_string_pretty(&output)?;
    file.write_all(json.as_bytes())?;

    let csv_path = config.output_dir.join("portfolio.csv");
    write_trajectory(&csv_path, bars, &result.portfolio_values)?;

    Ok(vec![json_path, csv_path])
}

fn write_trajectory(
    path: &Path,
    bars: &BarSeries,
    values: &[rust_decimal::Decimal],
) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "timestamp,close,portfolio_value")?;
    for (bar, value) in bars.bars().iter().zip(values) {
        writeln!(writer, "{},{},{}", bar.timestamp.to_rfc3339(), bar.close, value)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossover_trader::backtest::BacktestConfig;

    fn config(output_dir: PathBuf) -> BacktestCliConfig {
        BacktestCliConfig {
            symbol: "AAPL".to_string(),
            short_window: 5,
            long_window: 20,
            backtest: BacktestConfig::with_capital(dec!(10000)),
            source: DataSource::Synthetic { bars: 300 },
            output_dir,
        }
    }

    #[tokio::test]
    async fn test_synthetic_backtest_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().join("out"));

        run_backtest(config.clone()).await.unwrap();

        let json = fs::read_to_string(config.output_dir.join("results.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["symbol"], "AAPL");
        assert_eq!(parsed["bars"], 300);
        assert_eq!(parsed["initial_capital"], "10000");

        let csv = fs::read_to_string(config.output_dir.join("portfolio.csv")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,close,portfolio_value"));
        assert_eq!(lines.count(), 300);
    }

    #[tokio::test]
    async fn test_missing_csv_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path().to_path_buf());
        config.source = DataSource::Csv(dir.path().join("missing.csv"));

        assert!(run_backtest(config).await.is_err());
    }
}
