//! Rate provider capability and registry.
//!
//! Each external rate source implements `RateProvider`; a registry maps the
//! provider name to its implementation so refresh jobs can dispatch by name
//! instead of branching on strings.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::CurrencyError;

/// A quote as delivered by an external provider, before persistence.
#[derive(Debug, Clone)]
pub struct ProviderQuote {
    /// Base currency code.
    pub base_currency: String,
    /// Target currency code.
    pub target_currency: String,
    /// Exchange rate.
    pub rate: Decimal,
    /// Optional bid rate.
    pub bid_rate: Option<Decimal>,
    /// Optional ask rate.
    pub ask_rate: Option<Decimal>,
    /// Effective date of the quote.
    pub rate_date: NaiveDate,
}

/// Capability implemented by every external rate source adapter.
pub trait RateProvider: Send + Sync {
    /// Stable label stored on quotes ingested from this provider.
    fn name(&self) -> &str;

    /// Fetches quotes, optionally restricted to the given currency codes.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::ProviderFailure` when the upstream call fails.
    fn fetch(&self, filter_currencies: &[String]) -> Result<Vec<ProviderQuote>, CurrencyError>;
}

/// Registry mapping provider names to implementations.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn RateProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own name.
    pub fn register(&mut self, provider: Box<dyn RateProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::UnknownProvider` when nothing is registered
    /// under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn RateProvider, CurrencyError> {
        self.providers
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| CurrencyError::UnknownProvider(name.to_string()))
    }

    /// Names of all registered providers.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedProvider;

    impl RateProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, filter: &[String]) -> Result<Vec<ProviderQuote>, CurrencyError> {
            let quotes = vec![ProviderQuote {
                base_currency: "USD".to_string(),
                target_currency: "VND".to_string(),
                rate: dec!(25000),
                bid_rate: None,
                ask_rate: None,
                rate_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            }];
            Ok(quotes
                .into_iter()
                .filter(|q| filter.is_empty() || filter.contains(&q.base_currency))
                .collect())
        }
    }

    #[test]
    fn test_registry_dispatch() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(FixedProvider));

        let provider = registry.get("fixed").unwrap();
        let quotes = provider.fetch(&[]).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].rate, dec!(25000));
    }

    #[test]
    fn test_registry_filter_currencies() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(FixedProvider));

        let provider = registry.get("fixed").unwrap();
        let quotes = provider.fetch(&["EUR".to_string()]).unwrap();
        assert!(quotes.is_empty());
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(CurrencyError::UnknownProvider(_))
        ));
    }
}
