//! Exchange-rate resolution.
//!
//! Resolution ladder:
//! 1. same currency → rate 1, no lookup
//! 2. most recent direct quote (filtered by preferred source, when given)
//! 3. reciprocal of the most recent reverse quote (same filter)
//! 4. when a preferred source was given and matched nothing, retry the whole
//!    ladder with no source filter (best-available fallback)
//! 5. otherwise the rate is not found
//!
//! Aggregation callers soft-fail a missing rate to the original amount;
//! explicit conversions surface the error.

use rust_decimal::Decimal;

use super::conversion::convert_amount;
use super::error::CurrencyError;
use super::types::{RateLookupMethod, RateQuote, ResolvedRate};

/// Resolves a rate between two currencies from the given quotes.
///
/// # Errors
///
/// Returns `CurrencyError::RateNotFound` when no quote in either direction
/// matches, even after dropping the preferred-source filter.
pub fn resolve_rate(
    quotes: &[RateQuote],
    from: &str,
    to: &str,
    preferred_source: Option<&str>,
) -> Result<ResolvedRate, CurrencyError> {
    if from == to {
        return Ok(ResolvedRate::identity());
    }

    if let Some(resolved) = resolve_filtered(quotes, from, to, preferred_source) {
        return Ok(resolved);
    }

    // Best-available fallback: the preferred source had nothing.
    if preferred_source.is_some() {
        if let Some(mut resolved) = resolve_filtered(quotes, from, to, None) {
            resolved.method = RateLookupMethod::FallbackSource;
            return Ok(resolved);
        }
    }

    Err(CurrencyError::RateNotFound {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Converts for aggregation contexts: a missing rate falls back to the
/// original amount unmodified rather than failing.
#[must_use]
pub fn soft_convert(
    quotes: &[RateQuote],
    amount: Decimal,
    from: &str,
    to: &str,
    decimal_places: u32,
) -> Decimal {
    match resolve_rate(quotes, from, to, None) {
        Ok(resolved) => convert_amount(amount, resolved.rate, decimal_places),
        Err(_) => amount,
    }
}

fn resolve_filtered(
    quotes: &[RateQuote],
    from: &str,
    to: &str,
    source: Option<&str>,
) -> Option<ResolvedRate> {
    if let Some(quote) = most_recent(quotes, from, to, source) {
        return Some(ResolvedRate {
            rate: quote.rate,
            method: RateLookupMethod::Direct,
            source: Some(quote.source.clone()),
            rate_date: Some(quote.rate_date),
        });
    }

    if let Some(quote) = most_recent(quotes, to, from, source) {
        if quote.rate > Decimal::ZERO {
            return Some(ResolvedRate {
                rate: Decimal::ONE / quote.rate,
                method: RateLookupMethod::Inverse,
                source: Some(quote.source.clone()),
                rate_date: Some(quote.rate_date),
            });
        }
    }

    None
}

fn most_recent<'a>(
    quotes: &'a [RateQuote],
    base: &str,
    target: &str,
    source: Option<&str>,
) -> Option<&'a RateQuote> {
    quotes
        .iter()
        .filter(|q| q.base_currency == base && q.target_currency == target)
        .filter(|q| source.is_none_or(|s| q.source == s))
        .max_by_key(|q| q.rate_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn quote(base: &str, target: &str, rate: Decimal, source: &str, date: NaiveDate) -> RateQuote {
        RateQuote {
            base_currency: base.to_string(),
            target_currency: target.to_string(),
            rate,
            bid_rate: None,
            ask_rate: None,
            source: source.to_string(),
            rate_date: date,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_currency_no_lookup() {
        let resolved = resolve_rate(&[], "VND", "VND", None).unwrap();
        assert_eq!(resolved.rate, Decimal::ONE);
        assert_eq!(resolved.method, RateLookupMethod::Identity);
    }

    #[test]
    fn test_direct_quote_wins() {
        let quotes = vec![
            quote("USD", "VND", dec!(25000), "sbv", date(2025, 1, 1)),
            quote("VND", "USD", dec!(0.00004), "sbv", date(2025, 1, 1)),
        ];
        let resolved = resolve_rate(&quotes, "USD", "VND", None).unwrap();
        assert_eq!(resolved.rate, dec!(25000));
        assert_eq!(resolved.method, RateLookupMethod::Direct);
    }

    #[test]
    fn test_inverse_reciprocal() {
        // Only a target→base quote exists; the resolver inverts it.
        let quotes = vec![quote("VND", "USD", dec!(0.00004), "sbv", date(2025, 1, 1))];
        let resolved = resolve_rate(&quotes, "USD", "VND", None).unwrap();
        assert_eq!(resolved.rate, Decimal::ONE / dec!(0.00004));
        assert_eq!(resolved.method, RateLookupMethod::Inverse);
    }

    #[test]
    fn test_most_recent_quote_used() {
        let quotes = vec![
            quote("USD", "VND", dec!(24000), "sbv", date(2025, 1, 1)),
            quote("USD", "VND", dec!(25500), "sbv", date(2025, 2, 1)),
            quote("USD", "VND", dec!(25000), "sbv", date(2025, 1, 15)),
        ];
        let resolved = resolve_rate(&quotes, "USD", "VND", None).unwrap();
        assert_eq!(resolved.rate, dec!(25500));
    }

    #[test]
    fn test_preferred_source_filter() {
        let quotes = vec![
            quote("USD", "VND", dec!(25000), "sbv", date(2025, 1, 10)),
            quote("USD", "VND", dec!(25300), "vcb", date(2025, 1, 1)),
        ];
        // The vcb quote is older but matches the filter.
        let resolved = resolve_rate(&quotes, "USD", "VND", Some("vcb")).unwrap();
        assert_eq!(resolved.rate, dec!(25300));
        assert_eq!(resolved.source.as_deref(), Some("vcb"));
    }

    #[test]
    fn test_fallback_when_preferred_matches_nothing() {
        let quotes = vec![
            quote("USD", "VND", dec!(25000), "sbv", date(2025, 1, 10)),
            quote("USD", "VND", dec!(25300), "vcb", date(2025, 1, 1)),
        ];
        // Preferred source matches neither stored quote; resolution falls
        // back to best-available rather than failing.
        let resolved = resolve_rate(&quotes, "USD", "VND", Some("ecb")).unwrap();
        assert_eq!(resolved.rate, dec!(25000));
        assert_eq!(resolved.method, RateLookupMethod::FallbackSource);
    }

    #[test]
    fn test_rate_not_found() {
        let quotes = vec![quote("USD", "VND", dec!(25000), "sbv", date(2025, 1, 1))];
        let result = resolve_rate(&quotes, "EUR", "JPY", None);
        assert!(matches!(result, Err(CurrencyError::RateNotFound { .. })));
    }

    #[test]
    fn test_zero_rate_reverse_quote_is_unusable() {
        let quotes = vec![quote("VND", "USD", dec!(0), "bad", date(2025, 1, 1))];
        let result = resolve_rate(&quotes, "USD", "VND", None);
        assert!(matches!(result, Err(CurrencyError::RateNotFound { .. })));
    }

    #[test]
    fn test_soft_convert_falls_back_to_original() {
        assert_eq!(soft_convert(&[], dec!(123), "EUR", "VND", 4), dec!(123));

        let quotes = vec![quote("EUR", "VND", dec!(27000), "ecb", date(2025, 1, 1))];
        assert_eq!(
            soft_convert(&quotes, dec!(2), "EUR", "VND", 0),
            dec!(54000)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Resolving through an inverse quote is exactly the reciprocal.
        #[test]
        fn prop_inverse_is_reciprocal(rate_ten_thousandths in 1i64..100_000_000i64) {
            let rate = Decimal::new(rate_ten_thousandths, 4);
            let quotes = vec![quote("VND", "USD", rate, "x", date(2025, 1, 1))];

            let resolved = resolve_rate(&quotes, "USD", "VND", None).unwrap();
            prop_assert_eq!(resolved.rate, Decimal::ONE / rate);
        }

        /// Identity resolution never consults quotes.
        #[test]
        fn prop_same_currency_is_identity(
            rate_ten_thousandths in 1i64..100_000_000i64,
        ) {
            let rate = Decimal::new(rate_ten_thousandths, 4);
            let quotes = vec![quote("USD", "USD", rate, "weird", date(2025, 1, 1))];

            let resolved = resolve_rate(&quotes, "USD", "USD", None).unwrap();
            prop_assert_eq!(resolved.rate, Decimal::ONE);
            prop_assert_eq!(resolved.method, RateLookupMethod::Identity);
        }
    }
}
