//! Exchange rate quote types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored directional exchange-rate quote.
///
/// A quote for base→target does not imply one exists for target→base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuote {
    /// Base currency code.
    pub base_currency: String,
    /// Target currency code.
    pub target_currency: String,
    /// Exchange rate (1 base = rate target).
    pub rate: Decimal,
    /// Optional bid rate.
    pub bid_rate: Option<Decimal>,
    /// Optional ask rate.
    pub ask_rate: Option<Decimal>,
    /// Label of the source that produced this quote.
    pub source: String,
    /// Date the quote is effective.
    pub rate_date: NaiveDate,
}

/// How a resolved rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLookupMethod {
    /// Same-currency short circuit, rate is 1.
    Identity,
    /// Direct quote found (base → target).
    Direct,
    /// Reciprocal of a reverse quote (target → base).
    Inverse,
    /// Preferred source had nothing; fell back to best-available source.
    FallbackSource,
}

/// Result of a rate resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRate {
    /// The resolved exchange rate.
    pub rate: Decimal,
    /// How the rate was obtained.
    pub method: RateLookupMethod,
    /// Source label of the quote used, when one was consulted.
    pub source: Option<String>,
    /// Effective date of the quote used, when one was consulted.
    pub rate_date: Option<NaiveDate>,
}

impl ResolvedRate {
    /// The identity resolution for same-currency conversions.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            rate: Decimal::ONE,
            method: RateLookupMethod::Identity,
            source: None,
            rate_date: None,
        }
    }
}
