//! Tracing-based Trade Recorder
//!
//! Emits one structured event per trade on the `trades` target.

use super::recorder::{RecordError, TradeRecord, TradeRecorder};
use async_trait::async_trait;
use tracing::info;

/// Recorder that emits structured tracing logs
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl TracingRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TradeRecorder for TracingRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        info!(
            target: "trades",
            trade_id = %trade.trade_id,
            order_id = %trade.order_id,
            timestamp = %trade.timestamp.to_rfc3339(),
            symbol = %trade.symbol,
            side = %trade.side,
            quantity = trade.quantity,
            reference_price = %trade.reference_price,
            is_paper = trade.is_paper,
            "Trade recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderSide;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_tracing_recorder_does_not_error() {
        let recorder = TracingRecorder::new();
        let trade = TradeRecord::with_timestamp(
            "ord-9",
            "MSFT",
            OrderSide::Sell,
            4,
            dec!(410),
            false,
            Utc::now(),
        );
        recorder.record(&trade).await.unwrap();
    }
}
