pub mod moving_average;

use crate::types::BarSeries;
pub use moving_average::{
    compute_signals, MovingAverage, MovingAverageCrossover, SignalError, SignalFrame,
};

/// Desired exposure at one bar.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Signal {
    #[default]
    Flat,
    Long,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }
}

/// First difference of consecutive signals.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum PositionChange {
    /// Flat -> Long: open a long position.
    Enter,
    #[default]
    Hold,
    /// Long -> Flat: close the long position.
    Exit,
}

impl PositionChange {
    pub fn between(prev: Signal, curr: Signal) -> Self {
        match curr.as_i8() - prev.as_i8() {
            1 => PositionChange::Enter,
            -1 => PositionChange::Exit,
            _ => PositionChange::Hold,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            PositionChange::Enter => 1,
            PositionChange::Hold => 0,
            PositionChange::Exit => -1,
        }
    }
}

/// Strategy trait contract for backtesting and live decisions.
pub trait Strategy {
    /// Compute averages, signals and position changes aligned with `bars`.
    fn compute(&self, bars: &BarSeries) -> Result<SignalFrame, SignalError>;

    /// Position change at the newest bar.
    fn latest_change(&self, bars: &BarSeries) -> Result<PositionChange, SignalError> {
        let frame = self.compute(bars)?;
        Ok(frame
            .position_changes
            .last()
            .copied()
            .unwrap_or_default())
    }
}

impl Strategy for MovingAverageCrossover {
    fn compute(&self, bars: &BarSeries) -> Result<SignalFrame, SignalError> {
        compute_signals(bars, self.short_window(), self.long_window())
    }
}
