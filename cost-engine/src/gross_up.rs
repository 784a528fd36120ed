//! Gross-up of net fees
//!
//! A provider quoting a net fee must receive that amount after withholding,
//! so the payable is `net / (1 - rate)`. Rates of 100% or more leave the net
//! value unchanged. A rate close enough to 100% that the quotient no longer
//! fits a `Decimal` is rejected instead of overflowing.

use crate::{Error, Result};
use rust_decimal::Decimal;

/// Gross up `net` by `percent` (0-100)
pub fn gross_up(net: Decimal, percent: Decimal) -> Result<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;
    if percent >= hundred {
        return Ok(net);
    }

    let denominator = Decimal::ONE - percent / hundred;
    net.checked_div(denominator).ok_or_else(|| {
        Error::InvalidInput(format!("Gross-up of {} at {}% overflows", net, percent))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_zero_rate_is_identity() {
        assert_eq!(gross_up(Decimal::from(15000), Decimal::ZERO).unwrap(), Decimal::from(15000));
    }

    #[test]
    fn test_typical_rate() {
        // 20% withholding: 800 net → 1000 gross
        assert_eq!(gross_up(Decimal::from(800), Decimal::from(20)).unwrap(), Decimal::from(1000));
    }

    #[test]
    fn test_rate_at_or_above_hundred_returns_net() {
        assert_eq!(gross_up(Decimal::from(500), Decimal::ONE_HUNDRED).unwrap(), Decimal::from(500));
        assert_eq!(gross_up(Decimal::from(500), Decimal::from(150)).unwrap(), Decimal::from(500));
    }

    #[test]
    fn test_fractional_rate() {
        // 9.65% ISS/PIS/COFINS style rate
        let gross = gross_up(Decimal::from(1000), Decimal::new(965, 2)).unwrap();
        let expected = Decimal::from(1000) / (Decimal::ONE - Decimal::new(965, 4));
        assert_eq!(gross, expected);
    }

    #[test]
    fn test_rate_just_below_hundred_is_rejected() {
        let percent = Decimal::from_str("99.99999999999999999999999999").unwrap();
        let result = gross_up(Decimal::from(15000), percent);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
