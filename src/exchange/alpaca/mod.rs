//! Alpaca Exchange Client
//!
//! Market data and order execution for US equities through Alpaca Markets,
//! against either the paper or the live trading endpoint.
//!
//! ## Usage
//! ```ignore
//! use crossover_trader::exchange::AlpacaClient;
//!
//! let client = AlpacaClient::from_env(true)?; // paper endpoint
//! ```

mod client;
pub mod utils;

pub use client::AlpacaClient;
