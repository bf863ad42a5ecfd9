//! Backtesting engine for trading strategies.
//!
//! Replays a bar series and its position changes bar by bar, applying the
//! same sizing and cost arithmetic as live trading, and reports the
//! resulting portfolio-value trajectory.

pub mod data;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::risk::{check_risk_fraction, check_transaction_cost, SizingError};
use crate::state::PortfolioState;
use crate::strategy::{PositionChange, SignalError, Strategy};
use crate::types::{BarSeries, OrderSide};

/// Errors that can occur while running a simulation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BacktestError {
    #[error("bar series is empty")]
    EmptySeries,

    #[error("position changes ({changes}) and bars ({bars}) differ in length")]
    LengthMismatch { bars: usize, changes: usize },

    #[error("initial capital must be non-negative, got {0}")]
    NegativeCapital(Decimal),

    #[error("sizing error: {0}")]
    Sizing(#[from] SizingError),

    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
}

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    pub transaction_cost: Decimal,
    pub risk_fraction: Decimal,
}

impl BacktestConfig {
    /// Defaults of 0.1% cost and 2% risk with the given capital.
    pub fn with_capital(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            transaction_cost: Decimal::new(1, 3),
            risk_fraction: Decimal::new(2, 2),
        }
    }
}

/// A fill executed by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatedTrade {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: Decimal,
    /// Cash out for buys, cash in for sells.
    pub cash: Decimal,
    /// Realized PnL, set on sells only.
    pub pnl: Option<Decimal>,
}

/// Outcome of a backtest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktestResult {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub final_position: u64,
    pub final_value: Decimal,
    pub net_profit: Decimal,
    pub portfolio_values: Vec<Decimal>,
    /// Cash held after each bar.
    pub capital_values: Vec<Decimal>,
    pub trades: Vec<SimulatedTrade>,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Largest peak-to-trough decline as a fraction of the peak.
    pub max_drawdown: Decimal,
}

impl BacktestResult {
    pub fn return_percentage(&self) -> Decimal {
        if self.initial_capital.is_zero() {
            return Decimal::ZERO;
        }
        self.net_profit / self.initial_capital * Decimal::ONE_HUNDRED
    }

    /// Fraction of closed round trips that made money.
    pub fn win_rate(&self) -> Decimal {
        let closed = self.winning_trades + self.losing_trades;
        if closed == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(closed)
    }
}

fn max_drawdown(values: &[Decimal]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for value in values {
        if *value > peak {
            peak = *value;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - *value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Replay `position_changes` over `bars` and return the full result.
///
/// # Errors
/// Returns `BacktestError` for empty or misaligned input and invalid
/// capital, cost or risk parameters. A buy that capital cannot cover is
/// skipped, not an error.
pub fn replay(
    bars: &BarSeries,
    position_changes: &[PositionChange],
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    if bars.is_empty() {
        return Err(BacktestError::EmptySeries);
    }
    if bars.len() != position_changes.len() {
        return Err(BacktestError::LengthMismatch {
            bars: bars.len(),
            changes: position_changes.len(),
        });
    }
    check_transaction_cost(config.transaction_cost)?;
    check_risk_fraction(config.risk_fraction)?;
    let mut state = PortfolioState::new(config.initial_capital)
        .ok_or(BacktestError::NegativeCapital(config.initial_capital))?;

    let mut portfolio_values = Vec::with_capacity(bars.len());
    let mut capital_values = Vec::with_capacity(bars.len());
    let mut trades = Vec::new();
    let mut winning_trades = 0u32;
    let mut losing_trades = 0u32;

    for (index, (bar, change)) in bars.bars().iter().zip(position_changes).enumerate() {
        let price = bar.close;
        match change {
            PositionChange::Enter => {
                let plan = state.plan_buy(price, config.risk_fraction, config.transaction_cost)?;
                if let Some(cost) = state.apply_buy(plan.quantity, price, config.transaction_cost) {
                    debug!(index, quantity = plan.quantity, price = %price, "Simulated buy");
                    trades.push(SimulatedTrade {
                        index,
                        timestamp: bar.timestamp,
                        side: OrderSide::Buy,
                        quantity: plan.quantity,
                        price,
                        cash: cost,
                        pnl: None,
                    });
                }
            }
            PositionChange::Exit => {
                if let Some(closed) = state.apply_sell(price, config.transaction_cost) {
                    debug!(index, quantity = closed.quantity, price = %price, "Simulated sell");
                    if closed.pnl() > Decimal::ZERO {
                        winning_trades += 1;
                    } else {
                        losing_trades += 1;
                    }
                    trades.push(SimulatedTrade {
                        index,
                        timestamp: bar.timestamp,
                        side: OrderSide::Sell,
                        quantity: closed.quantity,
                        price,
                        cash: closed.proceeds,
                        pnl: Some(closed.pnl()),
                    });
                }
            }
            PositionChange::Hold => {}
        }
        portfolio_values.push(state.value(price));
        capital_values.push(state.capital());
    }

    let final_value = portfolio_values
        .last()
        .copied()
        .unwrap_or(config.initial_capital);

    Ok(BacktestResult {
        initial_capital: config.initial_capital,
        final_capital: state.capital(),
        final_position: state.position_qty(),
        final_value,
        net_profit: final_value - config.initial_capital,
        max_drawdown: max_drawdown(&portfolio_values),
        total_trades: trades.len() as u32,
        winning_trades,
        losing_trades,
        portfolio_values,
        capital_values,
        trades,
    })
}

/// Portfolio value at every bar for the given position changes.
pub fn simulate(
    bars: &BarSeries,
    position_changes: &[PositionChange],
    initial_capital: Decimal,
    transaction_cost: Decimal,
    risk_fraction: Decimal,
) -> Result<Vec<Decimal>, BacktestError> {
    let config = BacktestConfig {
        initial_capital,
        transaction_cost,
        risk_fraction,
    };
    replay(bars, position_changes, &config).map(|r| r.portfolio_values)
}

/// Compute the strategy's signals over `bars` and replay them.
pub fn run<S: Strategy>(
    strategy: &S,
    bars: &BarSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    let frame = strategy.compute(bars)?;
    let result = replay(bars, &frame.position_changes, config)?;
    info!(
        bars = bars.len(),
        trades = result.total_trades,
        final_value = %result.final_value,
        "Backtest complete"
    );
    Ok(result)
}
