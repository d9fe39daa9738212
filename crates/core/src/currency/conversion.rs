//! Currency conversion arithmetic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Use banker's rounding (round half to even)
//! - Store both original and converted amounts on transfer postings

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    (amount * rate).round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_amount() {
        // 100 USD * 25000 = 2,500,000 VND
        assert_eq!(convert_amount(dec!(100), dec!(25000), 0), dec!(2500000));
    }

    #[test]
    fn test_convert_with_rounding() {
        // 100.50 * 15000.5 = 1,507,550.25 -> rounds to 1,507,550
        assert_eq!(convert_amount(dec!(100.50), dec!(15000.5), 0), dec!(1507550));
    }

    #[test]
    fn test_bankers_rounding() {
        // 2.5 rounds to 2, 3.5 rounds to 4 (round half to even)
        assert_eq!(convert_amount(dec!(1), dec!(2.5), 0), dec!(2));
        assert_eq!(convert_amount(dec!(1), dec!(3.5), 0), dec!(4));
    }
}
