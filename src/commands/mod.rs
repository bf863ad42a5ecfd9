//! CLI command handlers.

mod backtest;
mod trade;

pub use backtest::run_backtest;
pub use trade::run_trade;
