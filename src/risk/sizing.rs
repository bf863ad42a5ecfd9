//! Position Sizing
//!
//! Fixed-fractional sizing: commit at most `risk_fraction` of capital to a
//! single position, rounded down to whole shares.
//!
//! # Example
//!
//! ```
//! use crossover_trader::risk::size_position;
//! use rust_decimal_macros::dec;
//!
//! let qty = size_position(dec!(100), dec!(100000), dec!(0.02)).unwrap();
//! assert_eq!(qty, 20);
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Precondition violations for sizing and cost calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizingError {
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("capital must be non-negative, got {0}")]
    NegativeCapital(Decimal),

    #[error("risk fraction must be in (0, 1], got {0}")]
    RiskFractionOutOfRange(Decimal),

    #[error("transaction cost must be in [0, 1), got {0}")]
    TransactionCostOutOfRange(Decimal),

    #[error("position size {0} does not fit in u64")]
    Overflow(Decimal),
}

/// Check a risk fraction lies in (0, 1].
pub fn check_risk_fraction(risk_fraction: Decimal) -> Result<(), SizingError> {
    if risk_fraction <= Decimal::ZERO || risk_fraction > Decimal::ONE {
        return Err(SizingError::RiskFractionOutOfRange(risk_fraction));
    }
    Ok(())
}

/// Check a proportional transaction cost lies in [0, 1).
pub fn check_transaction_cost(cost: Decimal) -> Result<(), SizingError> {
    if cost < Decimal::ZERO || cost >= Decimal::ONE {
        return Err(SizingError::TransactionCostOutOfRange(cost));
    }
    Ok(())
}

/// Number of whole shares worth at most `capital * risk_fraction` at `price`.
///
/// # Errors
/// Returns `SizingError` for a non-positive price, negative capital or a
/// risk fraction outside (0, 1].
pub fn size_position(
    price: Decimal,
    capital: Decimal,
    risk_fraction: Decimal,
) -> Result<u64, SizingError> {
    if price <= Decimal::ZERO {
        return Err(SizingError::NonPositivePrice(price));
    }
    if capital < Decimal::ZERO {
        return Err(SizingError::NegativeCapital(capital));
    }
    check_risk_fraction(risk_fraction)?;

    let shares = (capital * risk_fraction / price).floor();
    shares.to_u64().ok_or(SizingError::Overflow(shares))
}

/// Cash needed to buy `quantity` shares including proportional cost.
pub fn buy_cost(quantity: u64, price: Decimal, transaction_cost: Decimal) -> Decimal {
    Decimal::from(quantity) * price * (Decimal::ONE + transaction_cost)
}

/// Cash received for selling `quantity` shares net of proportional cost.
pub fn sell_proceeds(quantity: u64, price: Decimal, transaction_cost: Decimal) -> Decimal {
    Decimal::from(quantity) * price * (Decimal::ONE - transaction_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_budget_too_small_for_one_share() {
        assert_eq!(size_position(dec!(50), dec!(1000), dec!(0.02)).unwrap(), 0);
    }

    #[test]
    fn test_standard_sizing_and_cost() {
        let qty = size_position(dec!(100), dec!(100000), dec!(0.02)).unwrap();
        assert_eq!(qty, 20);
        assert_eq!(buy_cost(qty, dec!(100), dec!(0.001)), dec!(2002));
        assert_eq!(sell_proceeds(qty, dec!(100), dec!(0.001)), dec!(1998));
    }

    #[test]
    fn test_rounds_down() {
        // 1000 * 0.5 / 333 = 1.5015...
        assert_eq!(size_position(dec!(333), dec!(1000), dec!(0.5)).unwrap(), 1);
    }

    #[test]
    fn test_full_risk_fraction_allowed() {
        assert_eq!(size_position(dec!(10), dec!(100), Decimal::ONE).unwrap(), 10);
    }

    #[test]
    fn test_precondition_violations() {
        assert_eq!(
            size_position(Decimal::ZERO, dec!(100), dec!(0.1)).unwrap_err(),
            SizingError::NonPositivePrice(Decimal::ZERO)
        );
        assert_eq!(
            size_position(dec!(-1), dec!(100), dec!(0.1)).unwrap_err(),
            SizingError::NonPositivePrice(dec!(-1))
        );
        assert_eq!(
            size_position(dec!(10), dec!(-5), dec!(0.1)).unwrap_err(),
            SizingError::NegativeCapital(dec!(-5))
        );
        assert!(size_position(dec!(10), dec!(100), Decimal::ZERO).is_err());
        assert!(size_position(dec!(10), dec!(100), dec!(1.01)).is_err());
    }

    #[test]
    fn test_transaction_cost_bounds() {
        assert!(check_transaction_cost(Decimal::ZERO).is_ok());
        assert!(check_transaction_cost(dec!(0.001)).is_ok());
        assert!(check_transaction_cost(Decimal::ONE).is_err());
        assert!(check_transaction_cost(dec!(-0.001)).is_err());
    }
}
