//! Savings error types.

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::GoalStatus;

/// Errors raised by savings goal operations.
#[derive(Debug, Error)]
pub enum SavingsError {
    /// Contribution and withdrawal amounts must be positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Withdrawal larger than what the goal currently holds.
    #[error("Withdrawal of {requested} exceeds saved amount {available}")]
    ExceedsBalance {
        /// Current saved amount.
        available: Decimal,
        /// Requested withdrawal.
        requested: Decimal,
    },

    /// The requested lifecycle transition is not allowed from this state.
    #[error("Cannot {action} a goal in status {status:?}")]
    InvalidTransition {
        /// The attempted action.
        action: &'static str,
        /// The goal's current status.
        status: GoalStatus,
    },
}
