//! Moving average crossover trading controller.
//!
//! Each cycle:
//! 1. Fetches the most recent `history_limit` bars
//! 2. Computes the position change at the newest bar
//! 3. Sizes a prospective entry against current capital
//! 4. Submits a market order on Enter (if affordable) or on Exit (if holding)
//! 5. Applies the trade to the portfolio only once the order is accepted
//!
//! Cycle failures are logged and published; they never end the loop.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::config::{ConfigError, TradingConfig};
use super::events::{ControllerStatus, EventKind, EventLevel, TradingEvent};
use super::session::TradingSession;
use super::{RunControl, RunState};
use crate::exchange::{ExchangeError, ExecutionGateway, MarketDataSource, Order, OrderSide};
use crate::risk::SizingError;
use crate::state::PortfolioState;
use crate::strategy::{MovingAverageCrossover, PositionChange, SignalError, Strategy};

const EVENT_CAPACITY: usize = 256;

/// Recoverable failure of a single decision cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to fetch bars: {0}")]
    Fetch(#[source] ExchangeError),

    #[error("signal computation failed: {0}")]
    Signal(#[from] SignalError),

    #[error("position sizing failed: {0}")]
    Sizing(#[from] SizingError),

    #[error("order submission failed: {0}")]
    Order(#[source] ExchangeError),

    #[error("accepted {side} order for {quantity} shares could not be applied to the portfolio")]
    PortfolioMismatch { side: OrderSide, quantity: u64 },
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleDecision {
    Bought {
        order_id: String,
        quantity: u64,
        cost: Decimal,
    },
    Sold {
        order_id: String,
        quantity: u64,
        proceeds: Decimal,
        pnl: Decimal,
    },
    /// Enter signal, but the sized quantity was zero or unaffordable.
    SkippedInsufficientFunds { quantity: u64, cost: Decimal },
    Held,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub price: Decimal,
    pub change: PositionChange,
    /// Shares an entry at `price` would buy this cycle.
    pub position_size: u64,
    pub decision: CycleDecision,
}

pub struct TradingController {
    config: TradingConfig,
    strategy: MovingAverageCrossover,
    market_data: Arc<dyn MarketDataSource>,
    gateway: ExecutionGateway,
    portfolio: PortfolioState,
    control: RunControl,
    run_rx: watch::Receiver<RunState>,
    events: broadcast::Sender<TradingEvent>,
    status: watch::Sender<ControllerStatus>,
    last_price: Option<Decimal>,
    cycles: u64,
    errors: u64,
}

impl TradingController {
    /// Build a controller. The config is validated here; an invalid config
    /// never produces a controller and so can never reach `Running`.
    pub fn new(
        config: TradingConfig,
        market_data: Arc<dyn MarketDataSource>,
        gateway: ExecutionGateway,
        control: RunControl,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let strategy = MovingAverageCrossover::new(config.short_window, config.long_window)
            .map_err(|_| ConfigError::WindowOrder {
                short: config.short_window,
                long: config.long_window,
            })?;
        let portfolio = PortfolioState::new(config.initial_capital)
            .ok_or(ConfigError::NegativeCapital(config.initial_capital))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status, _) = watch::channel(ControllerStatus {
            run_state: control.state(),
            symbol: config.symbol.clone(),
            capital: portfolio.capital(),
            ..Default::default()
        });
        let run_rx = control.subscribe();

        Ok(Self {
            config,
            strategy,
            market_data,
            gateway,
            portfolio,
            control,
            run_rx,
            events,
            status,
            last_price: None,
            cycles: 0,
            errors: 0,
        })
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn status(&self) -> ControllerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradingEvent> {
        self.events.subscribe()
    }

    /// Move the controller onto its worker task. Exactly one worker exists
    /// per session, so repeated `start` calls can never run two loops.
    pub fn spawn(self) -> TradingSession {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let control = self.control.clone();
        let status = self.status.subscribe();
        let events = self.events.clone();
        let worker = tokio::spawn(self.run_worker(shutdown_rx));
        TradingSession::new(control, status, events, shutdown_tx, worker)
    }

    /// Perform one decision cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let bars = self
            .market_data
            .fetch_bars(
                &self.config.symbol,
                self.config.granularity,
                self.config.history_limit,
            )
            .await
            .map_err(CycleError::Fetch)?;

        let change = self.strategy.latest_change(&bars)?;
        let price = bars
            .last()
            .map(|bar| bar.close)
            .ok_or(CycleError::Signal(SignalError::EmptySeries))?;
        self.last_price = Some(price);

        let plan = self.portfolio.plan_buy(
            price,
            self.config.risk_fraction,
            self.config.transaction_cost,
        )?;

        let decision = match change {
            PositionChange::Enter if plan.affordable => {
                self.enter(price, plan.quantity).await?
            }
            PositionChange::Enter => {
                warn!(
                    quantity = plan.quantity,
                    cost = %plan.cost,
                    capital = %self.portfolio.capital(),
                    "Buy signal skipped: insufficient funds"
                );
                CycleDecision::SkippedInsufficientFunds {
                    quantity: plan.quantity,
                    cost: plan.cost,
                }
            }
            PositionChange::Exit if self.portfolio.has_position() => self.exit(price).await?,
            PositionChange::Exit | PositionChange::Hold => CycleDecision::Held,
        };

        Ok(CycleReport {
            price,
            change,
            position_size: plan.quantity,
            decision,
        })
    }

    async fn enter(&mut self, price: Decimal, quantity: u64) -> Result<CycleDecision, CycleError> {
        let side = OrderSide::Buy;
        let order = Order::market(self.config.symbol.clone(), side, quantity)
            .ok_or(CycleError::PortfolioMismatch { side, quantity })?;
        info!(quantity, price = %price, "Buy signal received. Placing order.");

        let ack = self
            .gateway
            .submit(&order, price)
            .await
            .map_err(CycleError::Order)?;

        let cost = self
            .portfolio
            .apply_buy(quantity, price, self.config.transaction_cost)
            .ok_or(CycleError::PortfolioMismatch { side, quantity })?;

        self.publish(TradingEvent::info(
            EventKind::TradeExecuted,
            format!(
                "Bought {} {} at {} (cost {}, order {})",
                quantity, self.config.symbol, price, cost, ack.order_id
            ),
        ));

        Ok(CycleDecision::Bought {
            order_id: ack.order_id,
            quantity,
            cost,
        })
    }

    async fn exit(&mut self, price: Decimal) -> Result<CycleDecision, CycleError> {
        let side = OrderSide::Sell;
        let quantity = self.portfolio.position_qty();
        let order = Order::market(self.config.symbol.clone(), side, quantity)
            .ok_or(CycleError::PortfolioMismatch { side, quantity })?;
        info!(quantity, price = %price, "Sell signal received. Placing order.");

        let ack = self
            .gateway
            .submit(&order, price)
            .await
            .map_err(CycleError::Order)?;

        let closed = self
            .portfolio
            .apply_sell(price, self.config.transaction_cost)
            .ok_or(CycleError::PortfolioMismatch { side, quantity })?;

        info!(
            quantity = closed.quantity,
            proceeds = %closed.proceeds,
            pnl = %closed.pnl(),
            "Closed position"
        );
        self.publish(TradingEvent::info(
            EventKind::TradeExecuted,
            format!(
                "Sold {} {} at {} (proceeds {}, pnl {}, order {})",
                closed.quantity,
                self.config.symbol,
                price,
                closed.proceeds,
                closed.pnl(),
                ack.order_id
            ),
        ));

        Ok(CycleDecision::Sold {
            order_id: ack.order_id,
            quantity: closed.quantity,
            proceeds: closed.proceeds,
            pnl: closed.pnl(),
        })
    }

    /// Run a cycle and report its outcome. Never fails.
    async fn cycle(&mut self) {
        self.cycles += 1;
        info!(cycle = self.cycles, symbol = %self.config.symbol, "Running trade cycle");

        match self.run_cycle().await {
            Ok(report) => {
                info!(
                    capital = %self.portfolio.capital(),
                    price = %report.price,
                    position_size = report.position_size,
                    positions_held = self.portfolio.position_qty(),
                    change = ?report.change,
                    "Cycle snapshot"
                );
            }
            Err(e) => {
                self.errors += 1;
                error!(error = %e, "Error in trading loop");
                self.publish(TradingEvent::new(
                    EventKind::CycleError,
                    EventLevel::Error,
                    e.to_string(),
                ));
            }
        }

        let status = self.refresh_status();
        self.publish(TradingEvent::info(EventKind::Snapshot, status.to_string()));
    }

    async fn run_worker(mut self, mut shutdown: oneshot::Receiver<()>) -> Self {
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                running = Self::wait_for_state(&mut self.run_rx, RunState::Running) => {
                    if !running {
                        break;
                    }
                }
            }
            self.run_loop().await;
        }
        info!(symbol = %self.config.symbol, "Trading worker exited");
        self
    }

    /// Execute cycles on the configured cadence until the run state
    /// leaves `Running`.
    async fn run_loop(&mut self) {
        info!(
            symbol = %self.config.symbol,
            cadence_secs = self.config.cadence.as_secs(),
            "Trading started"
        );
        self.on_state_change(RunState::Running, "Trading started");

        let mut interval = tokio::time::interval(self.config.cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            self.cycle().await;

            let stopped = tokio::select! {
                _ = interval.tick() => false,
                _ = Self::wait_for_state(&mut self.run_rx, RunState::Stopped) => true,
            };
            if stopped || *self.run_rx.borrow() != RunState::Running {
                break;
            }
        }

        info!(symbol = %self.config.symbol, "Trading stopped");
        self.on_state_change(RunState::Stopped, "Trading stopped");
    }

    /// Resolves once the state equals `target`. `false` if every control
    /// handle has been dropped.
    async fn wait_for_state(rx: &mut watch::Receiver<RunState>, target: RunState) -> bool {
        rx.wait_for(|state| *state == target).await.is_ok()
    }

    fn on_state_change(&mut self, state: RunState, message: &str) {
        self.status.send_modify(|status| status.run_state = state);
        self.publish(TradingEvent::info(EventKind::StateChanged, message));
    }

    fn refresh_status(&self) -> ControllerStatus {
        self.status.send_modify(|status| {
            status.capital = self.portfolio.capital();
            status.position_qty = self.portfolio.position_qty();
            status.last_price = self.last_price;
            status.cycles = self.cycles;
            status.errors = self.errors;
            status.last_update = Some(Utc::now());
        });
        self.status.borrow().clone()
    }

    fn publish(&self, event: TradingEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
