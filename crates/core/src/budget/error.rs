//! Budget error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when defining a budget.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Allocated amount must be positive.
    #[error("Allocated amount must be positive, got {0}")]
    NonPositiveAllocation(Decimal),

    /// End date must not precede the start date.
    #[error("Budget window ends {end} before it starts {start}")]
    InvalidWindow {
        /// Window start.
        start: NaiveDate,
        /// Window end.
        end: NaiveDate,
    },
}
