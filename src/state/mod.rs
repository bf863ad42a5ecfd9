//! Portfolio state for a single instrument.
//!
//! Capital and holdings are mutated only through `apply_buy` and
//! `apply_sell`, which either apply a trade completely or leave the state
//! untouched. Capital never goes negative and the holding is never sold
//! below zero.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::risk::{buy_cost, sell_proceeds, size_position, SizingError};

/// Sizing decision for a prospective buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyPlan {
    pub quantity: u64,
    pub cost: Decimal,
    /// `quantity > 0` and capital covers `cost`.
    pub affordable: bool,
}

/// Result of closing the full holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedPosition {
    pub quantity: u64,
    pub proceeds: Decimal,
    /// Total cash spent (including costs) acquiring the closed shares.
    pub entry_cost: Decimal,
}

impl ClosedPosition {
    pub fn pnl(&self) -> Decimal {
        self.proceeds - self.entry_cost
    }
}

/// Cash plus a long-only share holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioState {
    capital: Decimal,
    position_qty: u64,
    entry_cost: Decimal,
}

impl PortfolioState {
    /// Fresh flat portfolio. Returns `None` for negative capital.
    pub fn new(capital: Decimal) -> Option<Self> {
        if capital < Decimal::ZERO {
            return None;
        }
        Some(Self {
            capital,
            position_qty: 0,
            entry_cost: Decimal::ZERO,
        })
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn position_qty(&self) -> u64 {
        self.position_qty
    }

    pub fn has_position(&self) -> bool {
        self.position_qty > 0
    }

    /// Mark-to-market value at `price`.
    pub fn value(&self, price: Decimal) -> Decimal {
        self.capital + Decimal::from(self.position_qty) * price
    }

    /// Size a buy at `price` against current capital.
    pub fn plan_buy(
        &self,
        price: Decimal,
        risk_fraction: Decimal,
        transaction_cost: Decimal,
    ) -> Result<BuyPlan, SizingError> {
        let quantity = size_position(price, self.capital, risk_fraction)?;
        let cost = buy_cost(quantity, price, transaction_cost);
        Ok(BuyPlan {
            quantity,
            cost,
            affordable: quantity > 0 && self.capital >= cost,
        })
    }

    /// Buy `quantity` shares. Returns the cash spent, or `None` (state
    /// unchanged) when the quantity is zero or capital does not cover it.
    pub fn apply_buy(
        &mut self,
        quantity: u64,
        price: Decimal,
        transaction_cost: Decimal,
    ) -> Option<Decimal> {
        if quantity == 0 {
            return None;
        }
        let cost = buy_cost(quantity, price, transaction_cost);
        if self.capital < cost {
            return None;
        }
        self.capital -= cost;
        self.position_qty += quantity;
        self.entry_cost += cost;
        Some(cost)
    }

    /// Sell the full holding. `None` when flat.
    pub fn apply_sell(&mut self, price: Decimal, transaction_cost: Decimal) -> Option<ClosedPosition> {
        if self.position_qty == 0 {
            return None;
        }
        let quantity = self.position_qty;
        let proceeds = sell_proceeds(quantity, price, transaction_cost);
        let closed = ClosedPosition {
            quantity,
            proceeds,
            entry_cost: self.entry_cost,
        };
        self.capital += proceeds;
        self.position_qty = 0;
        self.entry_cost = Decimal::ZERO;
        Some(closed)
    }
}
