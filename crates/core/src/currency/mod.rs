//! Multi-currency handling and exchange rates.

pub mod conversion;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod types;

pub use conversion::convert_amount;
pub use error::CurrencyError;
pub use provider::{ProviderQuote, ProviderRegistry, RateProvider};
pub use resolver::{resolve_rate, soft_convert};
pub use types::{RateLookupMethod, RateQuote, ResolvedRate};
