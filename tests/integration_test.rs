use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use mockall::mock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

use crossover_trader::exchange::{
    ExchangeError, ExecutionGateway, Executor, Granularity, MarketDataSource, Order, OrderAck,
    OrderSide,
};
use crossover_trader::logging::CsvRecorder;
use crossover_trader::trading::{
    EventKind, RunControl, RunState, TradingConfig, TradingController,
};
use crossover_trader::types::{Bar, BarSeries};

// --- Mocks ---

mock! {
    pub Broker {}

    #[async_trait]
    impl Executor for Broker {
        async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError>;
    }
}

/// Replays one prepared series per fetch, then repeats the last.
struct ReplaySource {
    script: Mutex<VecDeque<BarSeries>>,
}

impl ReplaySource {
    fn new(script: Vec<Vec<Decimal>>) -> Self {
        Self {
            script: Mutex::new(script.iter().map(|c| minute_bars(c)).collect()),
        }
    }
}

#[async_trait]
impl MarketDataSource for ReplaySource {
    async fn fetch_bars(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<BarSeries, ExchangeError> {
        assert_eq!(symbol, "AAPL");
        assert_eq!(granularity, Granularity::OneMinute);
        assert_eq!(limit, 10);

        let mut script = self.script.lock().unwrap();
        let series = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        series.ok_or_else(|| ExchangeError::Other("script exhausted".to_string()))
    }

    async fn fetch_historical_bars(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<BarSeries, ExchangeError> {
        Err(ExchangeError::Other("not used".to_string()))
    }
}

fn minute_bars(closes: &[Decimal]) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, c)| Bar::from_close(start + ChronoDuration::minutes(i as i64), *c))
        .collect();
    BarSeries::from_bars(bars).unwrap()
}

fn ack(order: &Order) -> Result<OrderAck, ExchangeError> {
    Ok(OrderAck {
        order_id: format!("alpaca-{}", order.side),
        symbol: order.symbol.clone(),
        side: order.side,
        quantity: order.quantity,
    })
}

// --- Test ---

#[tokio::test(start_paused = true)]
async fn test_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("trades.csv");

    // Cycle 1: flat market. Cycle 2: breakout, buy. Cycle 3: reversal, sell.
    let source = Arc::new(ReplaySource::new(vec![
        vec![dec!(10); 6],
        vec![dec!(10), dec!(10), dec!(10), dec!(10), dec!(10), dec!(11)],
        vec![dec!(10), dec!(11), dec!(12), dec!(13), dec!(14), dec!(10)],
    ]));

    let mut broker = MockBroker::new();
    broker
        .expect_submit_order()
        .withf(|o| o.side == OrderSide::Buy && o.quantity == 181)
        .times(1)
        .returning(ack);
    broker
        .expect_submit_order()
        .withf(|o| o.side == OrderSide::Sell && o.quantity == 181)
        .times(1)
        .returning(ack);

    let gateway = ExecutionGateway::new(Arc::new(broker), true)
        .with_recorder(Arc::new(CsvRecorder::new(journal.clone())));
    let config = TradingConfig {
        symbol: "AAPL".to_string(),
        short_window: 2,
        long_window: 4,
        history_limit: 10,
        ..Default::default()
    };
    let controller = TradingController::new(config, source, gateway, RunControl::new()).unwrap();

    let session = controller.spawn();
    let mut events = session.subscribe();
    assert_eq!(session.state(), RunState::Stopped);

    assert!(session.start());
    // Cycles at t=0, 60, 120; the fourth would run at t=180.
    tokio::time::sleep(Duration::from_secs(150)).await;

    let status = session.status();
    assert_eq!(status.cycles, 3);
    assert_eq!(status.errors, 0);
    assert_eq!(status.position_qty, 0);
    assert_eq!(status.last_price, Some(dec!(10)));

    let controller = session.shutdown().await.unwrap();
    // 100000 - 1992.991 + 1808.19
    assert_eq!(controller.portfolio().capital(), dec!(99815.199));
    assert_eq!(controller.status().run_state, RunState::Stopped);

    let mut trades = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.kind == EventKind::TradeExecuted {
            trades.push(event.message);
        }
    }
    assert_eq!(trades.len(), 2);
    assert!(trades[0].starts_with("Bought 181 AAPL"));
    assert!(trades[1].starts_with("Sold 181 AAPL"));

    let lines: Vec<String> = std::fs::read_to_string(&journal)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("alpaca-buy"));
    assert!(lines[2].contains("alpaca-sell"));
}

#[tokio::test]
async fn test_invalid_config_never_builds_controller() {
    let source = Arc::new(ReplaySource::new(vec![vec![dec!(10)]]));
    let gateway = ExecutionGateway::new(Arc::new(MockBroker::new()), true);
    let config = TradingConfig {
        risk_fraction: Decimal::ZERO,
        ..Default::default()
    };

    assert!(TradingController::new(config, source, gateway, RunControl::new()).is_err());
}
