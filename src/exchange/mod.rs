//! Exchange Abstraction Layer
//!
//! Market data and order execution are consumed through two narrow async
//! traits so the controller can run against Alpaca, a local paper executor,
//! or test doubles without change.

pub mod alpaca;
pub mod gateway;
pub mod paper;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::BarSeries;
pub use crate::types::{Order, OrderSide};

pub use alpaca::AlpacaClient;
pub use gateway::ExecutionGateway;
pub use paper::PaperExecutor;

/// Errors surfaced by market data and execution backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("{0}")]
    Other(String),
}

/// Bar interval requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneMinute,
    FiveMinute,
    FifteenMinute,
    OneHour,
    OneDay,
}

impl Granularity {
    pub fn duration(self) -> chrono::Duration {
        match self {
            Granularity::OneMinute => chrono::Duration::minutes(1),
            Granularity::FiveMinute => chrono::Duration::minutes(5),
            Granularity::FifteenMinute => chrono::Duration::minutes(15),
            Granularity::OneHour => chrono::Duration::hours(1),
            Granularity::OneDay => chrono::Duration::days(1),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::OneMinute => write!(f, "1Min"),
            Granularity::FiveMinute => write!(f, "5Min"),
            Granularity::FifteenMinute => write!(f, "15Min"),
            Granularity::OneHour => write!(f, "1Hour"),
            Granularity::OneDay => write!(f, "1Day"),
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1min" | "1m" => Ok(Granularity::OneMinute),
            "5min" | "5m" => Ok(Granularity::FiveMinute),
            "15min" | "15m" => Ok(Granularity::FifteenMinute),
            "1hour" | "1h" => Ok(Granularity::OneHour),
            "1day" | "1d" => Ok(Granularity::OneDay),
            _ => Err(format!(
                "Unknown timeframe: {}. Valid options: 1Min, 5Min, 15Min, 1Hour, 1Day",
                s
            )),
        }
    }
}

/// Acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
}

/// Source of price bars.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The newest `limit` bars at `granularity`.
    async fn fetch_bars(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<BarSeries, ExchangeError>;

    /// Daily bars between `start` and `end`.
    async fn fetch_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, ExchangeError>;
}

/// Core trait for order execution.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Submit a market order. Failures are returned, never panicked.
    async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError>;
}
