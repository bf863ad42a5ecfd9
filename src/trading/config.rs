//! Live trading configuration and its validation.

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::exchange::Granularity;

/// Invalid configuration. Fatal at startup: a controller is never built
/// from a config that fails `validate`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("moving average windows must be positive (short={short}, long={long})")]
    NonPositiveWindow { short: usize, long: usize },

    #[error("short window ({short}) must be less than long window ({long})")]
    WindowOrder { short: usize, long: usize },

    #[error("risk fraction must be in (0, 1], got {0}")]
    InvalidRiskFraction(Decimal),

    #[error("transaction cost must be in [0, 1), got {0}")]
    InvalidTransactionCost(Decimal),

    #[error("initial capital must be non-negative, got {0}")]
    NegativeCapital(Decimal),

    #[error("cadence must be greater than zero")]
    ZeroCadence,

    #[error("history limit ({limit}) must cover the long window ({long})")]
    HistoryTooShort { limit: usize, long: usize },
}

/// Configuration for the live crossover trading loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingConfig {
    /// Instrument to trade (e.g., "AAPL")
    pub symbol: String,
    /// Short moving average window
    pub short_window: usize,
    /// Long moving average window
    pub long_window: usize,
    /// Starting cash for local accounting
    pub initial_capital: Decimal,
    /// Proportional cost per trade (0.001 = 0.1%)
    pub transaction_cost: Decimal,
    /// Fraction of capital committed per entry
    pub risk_fraction: Decimal,
    /// Wait between decision cycles
    pub cadence: Duration,
    /// Bars fetched per cycle
    pub history_limit: usize,
    /// Bar interval fetched per cycle
    pub granularity: Granularity,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            short_window: 40,
            long_window: 100,
            initial_capital: Decimal::new(100_000, 0),
            transaction_cost: Decimal::new(1, 3),
            risk_fraction: Decimal::new(2, 2),
            cadence: Duration::from_secs(60),
            history_limit: 200,
            granularity: Granularity::OneMinute,
        }
    }
}

impl TradingConfig {
    /// Check every constraint, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.short_window == 0 || self.long_window == 0 {
            return Err(ConfigError::NonPositiveWindow {
                short: self.short_window,
                long: self.long_window,
            });
        }
        if self.short_window >= self.long_window {
            return Err(ConfigError::WindowOrder {
                short: self.short_window,
                long: self.long_window,
            });
        }
        if self.risk_fraction <= Decimal::ZERO || self.risk_fraction > Decimal::ONE {
            return Err(ConfigError::InvalidRiskFraction(self.risk_fraction));
        }
        if self.transaction_cost < Decimal::ZERO || self.transaction_cost >= Decimal::ONE {
            return Err(ConfigError::InvalidTransactionCost(self.transaction_cost));
        }
        if self.initial_capital < Decimal::ZERO {
            return Err(ConfigError::NegativeCapital(self.initial_capital));
        }
        if self.cadence.is_zero() {
            return Err(ConfigError::ZeroCadence);
        }
        if self.history_limit < self.long_window {
            return Err(ConfigError::HistoryTooShort {
                limit: self.history_limit,
                long: self.long_window,
            });
        }
        Ok(())
    }
}
