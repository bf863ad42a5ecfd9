//! Risk management: position sizing under a fixed risk budget.

pub mod sizing;

pub use sizing::{
    buy_cost, check_risk_fraction, check_transaction_cost, sell_proceeds, size_position,
    SizingError,
};
