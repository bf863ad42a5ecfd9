use rust_decimal::Decimal;
use thiserror::Error;

use crate::strategy::{PositionChange, Signal};
use crate::types::BarSeries;

/// Precondition violations for signal computation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("bar series is empty; at least one bar is required")]
    EmptySeries,

    #[error("moving average windows must be positive (short={short}, long={long})")]
    InvalidWindow { short: usize, long: usize },

    #[error("short window ({short}) must be less than long window ({long})")]
    WindowOrder { short: usize, long: usize },
}

/// Short and long average at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverage {
    pub short: Decimal,
    pub long: Decimal,
}

/// Per-bar output of the crossover computation. All vectors have the
/// same length as the input series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalFrame {
    pub averages: Vec<MovingAverage>,
    pub signals: Vec<Signal>,
    pub position_changes: Vec<PositionChange>,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

fn check_windows(short_window: usize, long_window: usize) -> Result<(), SignalError> {
    if short_window == 0 || long_window == 0 {
        return Err(SignalError::InvalidWindow {
            short: short_window,
            long: long_window,
        });
    }
    if short_window >= long_window {
        return Err(SignalError::WindowOrder {
            short: short_window,
            long: long_window,
        });
    }
    Ok(())
}

/// Trailing mean with `min_periods = 1`: until the window fills, the mean
/// covers every bar seen so far.
fn rolling_mean(closes: &[Decimal], window: usize) -> Vec<Decimal> {
    let mut out = Vec::with_capacity(closes.len());
    let mut sum = Decimal::ZERO;
    for (i, close) in closes.iter().enumerate() {
        sum += *close;
        if i >= window {
            sum -= closes[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / Decimal::from(count));
    }
    out
}

/// Compute moving averages, crossover signals and position changes.
///
/// Signals are forced `Flat` for the first `short_window` bars even when the
/// warm-up averages already cross. Backtest results depend on this, so it is
/// kept as-is.
///
/// # Errors
/// `EmptySeries` for zero bars, `InvalidWindow`/`WindowOrder` for bad windows.
pub fn compute_signals(
    bars: &BarSeries,
    short_window: usize,
    long_window: usize,
) -> Result<SignalFrame, SignalError> {
    check_windows(short_window, long_window)?;
    if bars.is_empty() {
        return Err(SignalError::EmptySeries);
    }

    let closes: Vec<Decimal> = bars.closes().collect();
    let short = rolling_mean(&closes, short_window);
    let long = rolling_mean(&closes, long_window);

    let averages: Vec<MovingAverage> = short
        .iter()
        .zip(long.iter())
        .map(|(s, l)| MovingAverage { short: *s, long: *l })
        .collect();

    let signals: Vec<Signal> = averages
        .iter()
        .enumerate()
        .map(|(i, avg)| {
            if i >= short_window && avg.short > avg.long {
                Signal::Long
            } else {
                Signal::Flat
            }
        })
        .collect();

    let mut position_changes = Vec::with_capacity(signals.len());
    position_changes.push(PositionChange::Hold);
    position_changes.extend(
        signals
            .windows(2)
            .map(|pair| PositionChange::between(pair[0], pair[1])),
    );

    Ok(SignalFrame {
        averages,
        signals,
        position_changes,
    })
}

/// Configuration for the Moving Average Crossover strategy.
#[derive(Debug, Clone, Copy)]
pub struct MovingAverageCrossover {
    short_window: usize,
    long_window: usize,
}

impl MovingAverageCrossover {
    /// Creates a new Moving Average Crossover strategy configuration.
    ///
    /// # Errors
    /// Rejects zero windows and `short_window >= long_window`.
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, SignalError> {
        check_windows(short_window, long_window)?;
        Ok(Self {
            short_window,
            long_window,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }
}
