//! Ledger error types for validation and state errors.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Posting amount must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// The account balance cannot cover the requested amount.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance currently available on the account.
        available: Decimal,
        /// Amount the caller tried to spend.
        requested: Decimal,
    },

    /// Source and destination of a transfer must differ.
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// Account is inactive and cannot accept postings.
    #[error("Account {0} is inactive")]
    AccountInactive(Uuid),

    /// No exchange rate available for an explicit conversion.
    #[error("No exchange rate found for {from} to {to}")]
    RateUnavailable {
        /// Source currency code.
        from: String,
        /// Target currency code.
        to: String,
    },

    /// Transfer postings cannot be edited in place.
    #[error("Transfer postings are immutable; delete and recreate instead")]
    TransferImmutable,

    /// The posting already carries a reconciliation timestamp.
    #[error("Transaction {0} is already reconciled")]
    AlreadyReconciled(Uuid),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "VALIDATION_ERROR",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::RateUnavailable { .. } => "RATE_NOT_FOUND",
            Self::TransferImmutable => "TRANSFER_IMMUTABLE",
            Self::AlreadyReconciled(_) => "ALREADY_RECONCILED",
        }
    }
}
