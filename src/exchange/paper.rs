//! Local paper executor: accepts every order without touching the network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::exchange::{ExchangeError, Executor, Order, OrderAck};

/// Fills every order immediately. Useful for dry runs against live data.
#[derive(Debug, Default)]
pub struct PaperExecutor {
    fills: AtomicU64,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders accepted so far.
    pub fn fill_count(&self) -> u64 {
        self.fills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for PaperExecutor {
    async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError> {
        self.fills.fetch_add(1, Ordering::SeqCst);
        let order_id = format!("paper-{}", uuid::Uuid::new_v4());
        info!(
            order_id = %order_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            "PAPER TRADE executed"
        );
        Ok(OrderAck {
            order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderSide;

    #[tokio::test]
    async fn test_paper_executor_accepts_orders() {
        let executor = PaperExecutor::new();
        let order = Order::market("AAPL", OrderSide::Buy, 7).unwrap();
        let ack = executor.submit_order(&order).await.unwrap();
        assert!(ack.order_id.starts_with("paper-"));
        assert_eq!(ack.quantity, 7);
        assert_eq!(ack.side, OrderSide::Buy);
        assert_eq!(executor.fill_count(), 1);
    }
}
