//! Observable output of a running controller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    StateChanged,
    TradeExecuted,
    CycleError,
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// Timestamped, human-readable event broadcast to session subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct TradingEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub kind: EventKind,
    pub message: String,
}

impl TradingEvent {
    pub fn new(kind: EventKind, level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            kind,
            message: message.into(),
        }
    }

    pub fn info(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, EventLevel::Info, message)
    }
}

/// Latest view of the controller, published after every cycle and state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub run_state: RunState,
    pub symbol: String,
    pub capital: Decimal,
    pub position_qty: u64,
    pub last_price: Option<Decimal>,
    pub cycles: u64,
    pub errors: u64,
    pub last_update: Option<DateTime<Utc>>,
}

impl std::fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] capital={} position={} last_price={} cycles={} errors={}",
            self.symbol,
            self.run_state,
            self.capital,
            self.position_qty,
            self.last_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.cycles,
            self.errors
        )
    }
}
