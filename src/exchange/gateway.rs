//! Execution gateway.
//!
//! Wraps an `Executor` so every submission is logged and every accepted
//! order is journaled. A journaling failure never fails the trade.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::exchange::{ExchangeError, Executor, Order, OrderAck};
use crate::logging::{TradeRecord, TradeRecorder};

pub struct ExecutionGateway {
    executor: Arc<dyn Executor>,
    recorder: Option<Arc<dyn TradeRecorder>>,
    is_paper: bool,
}

impl ExecutionGateway {
    pub fn new(executor: Arc<dyn Executor>, is_paper: bool) -> Self {
        Self {
            executor,
            recorder: None,
            is_paper,
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn TradeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Submit `order`. `reference_price` is the close the decision was
    /// based on and is only used for the journal.
    pub async fn submit(
        &self,
        order: &Order,
        reference_price: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        let ack = match self.executor.submit_order(order).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(
                    symbol = %order.symbol,
                    side = %order.side,
                    quantity = order.quantity,
                    error = %e,
                    "Order submission failed"
                );
                return Err(e);
            }
        };

        info!(
            order_id = %ack.order_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            price = %reference_price,
            "Trade executed"
        );

        if let Some(recorder) = &self.recorder {
            let record = TradeRecord::with_timestamp(
                ack.order_id.clone(),
                order.symbol.clone(),
                order.side,
                order.quantity,
                reference_price,
                self.is_paper,
                Utc::now(),
            );
            if let Err(e) = recorder.record(&record).await {
                warn!(error = %e, order_id = %ack.order_id, "Failed to record trade");
            }
        }

        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExecutor;
    use crate::logging::RecordError;
    use crate::types::OrderSide;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal(Mutex<Vec<TradeRecord>>);

    #[async_trait]
    impl TradeRecorder for Journal {
        async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
            self.0.lock().unwrap().push(trade.clone());
            Ok(())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Executor for Rejecting {
        async fn submit_order(&self, _order: &Order) -> Result<OrderAck, ExchangeError> {
            Err(ExchangeError::OrderRejected("insufficient buying power".to_string()))
        }
    }

    #[tokio::test]
    async fn test_accepted_order_is_journaled() {
        let journal = Arc::new(Journal::default());
        let gateway = ExecutionGateway::new(Arc::new(PaperExecutor::new()), true)
            .with_recorder(journal.clone());

        let order = Order::market("AAPL", OrderSide::Buy, 20).unwrap();
        let ack = gateway.submit(&order, dec!(100)).await.unwrap();

        let records = journal.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].order_id, ack.order_id);
        assert_eq!(records[0].quantity, 20);
        assert_eq!(records[0].reference_price, dec!(100));
        assert!(records[0].is_paper);
    }

    #[tokio::test]
    async fn test_rejected_order_is_not_journaled() {
        let journal = Arc::new(Journal::default());
        let gateway = ExecutionGateway::new(Arc::new(Rejecting), false).with_recorder(journal.clone());

        let order = Order::market("AAPL", OrderSide::Sell, 5).unwrap();
        let err = gateway.submit(&order, dec!(99)).await.unwrap_err();
        assert!(matches!(err, ExchangeError::OrderRejected(_)));
        assert!(journal.0.lock().unwrap().is_empty());
    }
}
