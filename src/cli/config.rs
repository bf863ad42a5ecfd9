//! CLI configuration structs bridging CLI arguments to domain types.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crossover_trader::backtest::BacktestConfig;
use crossover_trader::exchange::Granularity;
use crossover_trader::trading::TradingConfig;

use super::StrategyArgs;

/// Where orders go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Alpaca live endpoint
    Live,
    /// Alpaca paper endpoint
    Paper,
    /// Local fills, no order traffic
    DryRun,
}

impl ExecutionMode {
    /// Paper unless `--live` or `--dry-run` is given.
    pub fn from_flags(live: bool, dry_run: bool) -> Self {
        match (live, dry_run) {
            (_, true) => Self::DryRun,
            (true, false) => Self::Live,
            (false, false) => Self::Paper,
        }
    }

    /// Whether journaled trades are simulated.
    pub fn is_paper(self) -> bool {
        !matches!(self, Self::Live)
    }

    /// Default trade journal for this mode.
    pub fn journal_file(self) -> PathBuf {
        match self {
            Self::Live => PathBuf::from("live_trades.csv"),
            Self::Paper | Self::DryRun => PathBuf::from("paper_trades.csv"),
        }
    }
}

impl StrategyArgs {
    pub fn trading_config(
        &self,
        cadence_secs: u64,
        history_limit: usize,
        granularity: Granularity,
    ) -> TradingConfig {
        TradingConfig {
            symbol: self.symbol.clone(),
            short_window: self.short_window,
            long_window: self.long_window,
            initial_capital: self.initial_capital,
            transaction_cost: self.transaction_cost,
            risk_fraction: self.risk_fraction,
            cadence: Duration::from_secs(cadence_secs),
            history_limit,
            granularity,
        }
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            transaction_cost: self.transaction_cost,
            risk_fraction: self.risk_fraction,
        }
    }
}

/// Errors that can occur when parsing backtest configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BacktestConfigError {
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),

    #[error("Start ({start}) must be before end ({end})")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Synthetic series needs at least one bar")]
    NoBars,

    #[error("No data source given. Use --csv, --synthetic or --start/--end")]
    MissingSource,
}

/// Historical bar source for a backtest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic { bars: usize },
    Alpaca {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl DataSource {
    /// Pick the source from the mutually exclusive CLI flags.
    pub fn from_args(
        csv: Option<PathBuf>,
        synthetic: bool,
        bars: usize,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, BacktestConfigError> {
        if let Some(path) = csv {
            return Ok(Self::Csv(path));
        }
        if synthetic {
            if bars == 0 {
                return Err(BacktestConfigError::NoBars);
            }
            return Ok(Self::Synthetic { bars });
        }
        match (start, end) {
            (Some(start), Some(end)) => {
                let start = parse_date(start)?;
                let end = parse_date(end)?;
                if start >= end {
                    return Err(BacktestConfigError::InvalidRange { start, end });
                }
                Ok(Self::Alpaca { start, end })
            }
            _ => Err(BacktestConfigError::MissingSource),
        }
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, BacktestConfigError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| BacktestConfigError::InvalidDate(value.to_string()))
}

/// CLI configuration for backtesting.
#[derive(Debug, Clone)]
pub struct BacktestCliConfig {
    pub symbol: String,
    pub short_window: usize,
    pub long_window: usize,
    pub backtest: BacktestConfig,
    pub source: DataSource,
    /// Output directory for results
    pub output_dir: PathBuf,
}
