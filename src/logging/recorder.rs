//! Trade Recording System

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::OrderSide;

/// Error type for trade recording operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single executed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    /// Unique trade identifier
    pub trade_id: String,
    /// Broker order id from the acknowledgement
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    /// Last close at decision time (market orders carry no limit price)
    pub reference_price: Decimal,
    pub is_paper: bool,
}

impl TradeRecord {
    /// Create a trade record with an explicit timestamp.
    pub fn with_timestamp(
        order_id: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        reference_price: Decimal,
        is_paper: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            timestamp,
            symbol: symbol.into(),
            side,
            quantity,
            reference_price,
            is_paper,
        }
    }

    /// Format as CSV line.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.trade_id,
            self.order_id,
            self.timestamp.to_rfc3339(),
            self.symbol,
            self.side,
            self.quantity,
            self.reference_price,
            self.is_paper,
        )
    }

    /// CSV header
    pub fn csv_header() -> &'static str {
        "trade_id,order_id,timestamp,symbol,side,quantity,reference_price,is_paper"
    }
}

/// Trait for recording trades to various backends
#[async_trait]
pub trait TradeRecorder: Send + Sync {
    /// Record a trade.
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError>;
}

/// A recorder that fans out to multiple backends
pub struct MultiRecorder {
    recorders: Vec<Box<dyn TradeRecorder>>,
}

impl MultiRecorder {
    pub fn new(recorders: Vec<Box<dyn TradeRecorder>>) -> Self {
        Self { recorders }
    }

    pub fn add(&mut self, recorder: Box<dyn TradeRecorder>) {
        self.recorders.push(recorder);
    }
}

#[async_trait]
impl TradeRecorder for MultiRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        let mut error_count = 0;
        let mut last_error = None;

        for recorder in &self.recorders {
            if let Err(e) = recorder.record(trade).await {
                tracing::error!(error = %e, "Failed to record trade to backend");
                last_error = Some(e);
                error_count += 1;
            }
        }

        // Only fail when every backend failed.
        if error_count > 0 && error_count == self.recorders.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample() -> TradeRecord {
        TradeRecord::with_timestamp(
            "ord-1",
            "AAPL",
            OrderSide::Buy,
            20,
            dec!(187.5),
            true,
            Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_trade_record_csv() {
        let csv = sample().to_csv_line();
        assert!(csv.contains(",ord-1,2024-03-01T15:00:00+00:00,AAPL,buy,20,187.5,true"));
        assert_eq!(
            TradeRecord::csv_header().split(',').count(),
            csv.split(',').count()
        );
    }

    struct Counting(Arc<AtomicUsize>, bool);

    #[async_trait]
    impl TradeRecorder for Counting {
        async fn record(&self, _trade: &TradeRecord) -> Result<(), RecordError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                Err(RecordError::Io(std::io::Error::other("disk full")))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_multi_recorder_fails_only_when_all_fail() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mixed = MultiRecorder::new(vec![
            Box::new(Counting(calls.clone(), true)),
            Box::new(Counting(calls.clone(), false)),
        ]);
        assert!(mixed.record(&sample()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let mut failing = MultiRecorder::new(vec![Box::new(Counting(calls.clone(), true))]);
        failing.add(Box::new(Counting(calls.clone(), true)));
        assert!(failing.record(&sample()).await.is_err());
    }
}
