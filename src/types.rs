//! Common Types Module
//!
//! Bars, bar series and orders shared by the signal engine, the simulator
//! and the live controller.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Only market orders are ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
}

/// Orders stay open until filled or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    GoodTillCanceled,
}

/// One OHLCV observation for a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Bar whose OHLC values all equal `close`. Handy for close-only data.
    pub fn from_close(timestamp: DateTime<Utc>, close: Decimal) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
        }
    }
}

/// Errors raised when a bar sequence violates its ordering invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("bar at index {index} ({timestamp}) is not after the previous bar")]
    NotIncreasing {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Bars ordered by strictly increasing timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series, rejecting duplicate or out-of-order timestamps.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NotIncreasing {
                    index: index + 1,
                    timestamp: pair[1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Append a bar; it must be newer than the current last bar.
    pub fn push(&mut self, bar: Bar) -> Result<(), SeriesError> {
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(SeriesError::NotIncreasing {
                    index: self.bars.len(),
                    timestamp: bar.timestamp,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    /// Keep only the newest `limit` bars.
    pub fn truncate_front(&mut self, limit: usize) {
        if self.bars.len() > limit {
            let remove_count = self.bars.len() - limit;
            self.bars.drain(0..remove_count);
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.bars.iter().map(|b| b.close)
    }

    /// Aggregate into `interval` buckets aligned to the Unix epoch. Each
    /// bucket is stamped with its start and takes the first open, the last
    /// close, the extreme high and low, and the summed volume.
    pub fn resample(&self, interval: chrono::Duration) -> BarSeries {
        let secs = interval.num_seconds();
        if secs <= 0 {
            return self.clone();
        }

        let mut bars: Vec<Bar> = Vec::new();
        for bar in &self.bars {
            let ts = bar.timestamp.timestamp();
            let bucket = Utc
                .timestamp_opt(ts - ts.rem_euclid(secs), 0)
                .single()
                .unwrap_or(bar.timestamp);
            match bars.last_mut() {
                Some(last) if last.timestamp == bucket => {
                    last.high = last.high.max(bar.high);
                    last.low = last.low.min(bar.low);
                    last.close = bar.close;
                    last.volume += bar.volume;
                }
                _ => bars.push(Bar {
                    timestamp: bucket,
                    ..bar.clone()
                }),
            }
        }
        BarSeries { bars }
    }
}

/// A market order ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

impl Order {
    /// Market GTC order. Returns `None` for a zero quantity.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: u64) -> Option<Self> {
        if quantity == 0 {
            return None;
        }
        Some(Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::GoodTillCanceled,
        })
    }
}
