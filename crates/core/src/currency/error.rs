//! Currency error types.

use thiserror::Error;

/// Errors that can occur during currency operations.
#[derive(Debug, Error)]
pub enum CurrencyError {
    /// No usable quote exists for the currency pair.
    #[error("No exchange rate found for {from} to {to}")]
    RateNotFound {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// A stored quote has a non-positive rate.
    #[error("Exchange rate must be positive")]
    NonPositiveRate,

    /// No provider registered under the given name.
    #[error("Unknown rate provider: {0}")]
    UnknownProvider(String),

    /// A provider failed while fetching quotes.
    #[error("Rate provider {provider} failed: {message}")]
    ProviderFailure {
        /// Provider name.
        provider: String,
        /// Provider-supplied failure detail.
        message: String,
    },
}
