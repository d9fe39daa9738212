//! Exchange rate repository.
//!
//! Quotes are stored directionally and upserted by
//! `(base, target, source, rate_date)`; resolution itself is the pure ladder
//! in `savora-core` (direct, then inverse, then best-available fallback).

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use savora_core::currency::{
    convert_amount, resolve_rate, CurrencyError, ProviderRegistry, RateQuote, ResolvedRate,
};
use savora_core::ledger::AMOUNT_SCALE;

use crate::entities::exchange_rates;

/// Error types for exchange rate operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeRateError {
    /// Rate resolution or provider failure.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for upserting a quote.
#[derive(Debug, Clone)]
pub struct UpsertRateInput {
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
    /// Source label.
    pub source: String,
    /// Effective date.
    pub rate_date: chrono::NaiveDate,
}

/// Exchange rate repository.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    db: DatabaseConnection,
}

impl ExchangeRateRepository {
    /// Creates a new exchange rate repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upserts a quote by `(base, target, source, rate_date)`.
    ///
    /// Re-ingesting the same day and source overwrites the prior quote
    /// instead of duplicating it.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveRate` for a zero or negative rate, or an error
    /// if the write fails.
    pub async fn upsert_rate(
        &self,
        input: UpsertRateInput,
    ) -> Result<exchange_rates::Model, ExchangeRateError> {
        validate_rate(input.rate)?;

        let existing = exchange_rates::Entity::find()
            .filter(exchange_rates::Column::BaseCurrency.eq(&input.base_currency))
            .filter(exchange_rates::Column::TargetCurrency.eq(&input.target_currency))
            .filter(exchange_rates::Column::Source.eq(&input.source))
            .filter(exchange_rates::Column::RateDate.eq(input.rate_date))
            .one(&self.db)
            .await?;

        let now = chrono::Utc::now().into();
        let model = match existing {
            Some(row) => {
                let mut active: exchange_rates::ActiveModel = row.into();
                active.rate = Set(input.rate);
                active.bid_rate = Set(input.bid_rate);
                active.ask_rate = Set(input.ask_rate);
                active.updated_at = Set(now);
                active.update(&self.db).await?
            }
            None => {
                let active = exchange_rates::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    base_currency: Set(input.base_currency),
                    target_currency: Set(input.target_currency),
                    rate: Set(input.rate),
                    bid_rate: Set(input.bid_rate),
                    ask_rate: Set(input.ask_rate),
                    source: Set(input.source),
                    rate_date: Set(input.rate_date),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&self.db).await?
            }
        };
        Ok(model)
    }

    /// Resolves a rate between two currencies.
    ///
    /// # Errors
    ///
    /// Returns `RateNotFound` when no quote in either direction matches,
    /// even after dropping the preferred-source filter.
    pub async fn get_rate(
        &self,
        from: &str,
        to: &str,
        preferred_source: Option<&str>,
    ) -> Result<ResolvedRate, ExchangeRateError> {
        let quotes = load_quotes_for_pair(&self.db, from, to).await?;
        let resolved = resolve_rate(&quotes, from, to, preferred_source)?;
        Ok(resolved)
    }

    /// Converts an amount between currencies, hard-failing on a missing
    /// rate. Aggregation callers use `soft_convert` from `savora-core` over
    /// prefetched quotes instead.
    ///
    /// # Errors
    ///
    /// Returns `RateNotFound` when the rate cannot be resolved.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        preferred_source: Option<&str>,
    ) -> Result<Decimal, ExchangeRateError> {
        let resolved = self.get_rate(from, to, preferred_source).await?;
        Ok(convert_amount(amount, resolved.rate, AMOUNT_SCALE))
    }

    /// Fetches fresh quotes from a registered provider and upserts them.
    ///
    /// Returns how many quotes were ingested.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProvider` for an unregistered name and
    /// `ProviderFailure` when the upstream fetch fails.
    pub async fn update_rates(
        &self,
        registry: &ProviderRegistry,
        provider_name: &str,
        filter_currencies: &[String],
    ) -> Result<usize, ExchangeRateError> {
        let provider = registry.get(provider_name)?;
        let quotes = provider.fetch(filter_currencies)?;
        let count = quotes.len();

        for quote in quotes {
            self.upsert_rate(UpsertRateInput {
                base_currency: quote.base_currency,
                target_currency: quote.target_currency,
                rate: quote.rate,
                bid_rate: quote.bid_rate,
                ask_rate: quote.ask_rate,
                source: provider_name.to_string(),
                rate_date: quote.rate_date,
            })
            .await?;
        }

        tracing::info!(provider = provider_name, count, "exchange rates refreshed");
        Ok(count)
    }

    /// Loads every stored quote touching any of the given currencies, for
    /// prefetching ahead of aggregate soft conversions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn load_quotes_for_currencies(
        &self,
        currencies: &[String],
    ) -> Result<Vec<RateQuote>, ExchangeRateError> {
        let quotes = load_quotes_touching(&self.db, currencies).await?;
        Ok(quotes)
    }
}

/// Loads every stored quote whose base or target is in `currencies`.
pub(crate) async fn load_quotes_touching<C: ConnectionTrait>(
    conn: &C,
    currencies: &[String],
) -> Result<Vec<RateQuote>, DbErr> {
    let rows = exchange_rates::Entity::find()
        .filter(
            Condition::any()
                .add(exchange_rates::Column::BaseCurrency.is_in(currencies.to_vec()))
                .add(exchange_rates::Column::TargetCurrency.is_in(currencies.to_vec())),
        )
        .all(conn)
        .await?;
    Ok(rows.iter().map(quote_from_model).collect())
}

/// Loads quotes in both directions for one currency pair.
pub(crate) async fn load_quotes_for_pair<C: ConnectionTrait>(
    conn: &C,
    from: &str,
    to: &str,
) -> Result<Vec<RateQuote>, DbErr> {
    let rows = exchange_rates::Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(exchange_rates::Column::BaseCurrency.eq(from))
                        .add(exchange_rates::Column::TargetCurrency.eq(to)),
                )
                .add(
                    Condition::all()
                        .add(exchange_rates::Column::BaseCurrency.eq(to))
                        .add(exchange_rates::Column::TargetCurrency.eq(from)),
                ),
        )
        .all(conn)
        .await?;
    Ok(rows.iter().map(quote_from_model).collect())
}

/// A quote with a zero or negative rate is never storable; the resolver
/// would divide by it on the inverse path.
fn validate_rate(rate: Decimal) -> Result<(), CurrencyError> {
    if rate <= Decimal::ZERO {
        return Err(CurrencyError::NonPositiveRate);
    }
    Ok(())
}

/// Maps a stored row into the pure resolver's quote type.
fn quote_from_model(row: &exchange_rates::Model) -> RateQuote {
    RateQuote {
        base_currency: row.base_currency.clone(),
        target_currency: row.target_currency.clone(),
        rate: row.rate,
        bid_rate: row.bid_rate,
        ask_rate: row.ask_rate,
        source: row.source.clone(),
        rate_date: row.rate_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_non_positive_rate_rejected() {
        assert!(matches!(
            validate_rate(dec!(0)),
            Err(CurrencyError::NonPositiveRate)
        ));
        assert!(matches!(
            validate_rate(dec!(-25000)),
            Err(CurrencyError::NonPositiveRate)
        ));
        assert!(validate_rate(dec!(25000)).is_ok());
    }

    #[test]
    fn test_quote_mapping_preserves_direction() {
        let now = chrono::Utc::now().into();
        let row = exchange_rates::Model {
            id: Uuid::now_v7(),
            base_currency: "USD".to_string(),
            target_currency: "VND".to_string(),
            rate: dec!(25000),
            bid_rate: Some(dec!(24990)),
            ask_rate: Some(dec!(25010)),
            source: "vietcombank".to_string(),
            rate_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            created_at: now,
            updated_at: now,
        };

        let quote = quote_from_model(&row);
        assert_eq!(quote.base_currency, "USD");
        assert_eq!(quote.target_currency, "VND");
        assert_eq!(quote.rate, dec!(25000));
        assert_eq!(quote.source, "vietcombank");
    }
}
