//! Single-instrument moving average crossover trading.
//!
//! The library holds the signal, sizing, simulation and live trading
//! components; the `crossover-trader` binary wires them to a CLI.

pub mod backtest;
pub mod exchange;
pub mod logging;
pub mod observability;
pub mod risk;
pub mod state;
pub mod strategy;
pub mod trading;
pub mod types;
