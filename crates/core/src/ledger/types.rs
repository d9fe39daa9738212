//! Ledger domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account kinds supported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Bank account.
    Bank,
    /// Credit card (credit-line semantics).
    CreditCard,
    /// Investment account.
    Investment,
    /// Physical cash.
    Cash,
    /// Loan account (credit-line semantics).
    Loan,
    /// Electronic wallet.
    EWallet,
    /// Anything else.
    Other,
}

impl AccountKind {
    /// Returns true for credit-line kinds, where the balance represents
    /// available credit rather than owned funds and may go negative.
    #[must_use]
    pub const fn is_credit_line(self) -> bool {
        matches!(self, Self::CreditCard | Self::Loan)
    }
}

/// The direction a posting moves money on its account.
///
/// Transfer sides are stored as an expense posting on the source account and
/// an income posting on the destination, linked by a transfer peer id, so
/// the signed balance effect is always derivable from this kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingKind {
    /// Money flowing into the account.
    Income,
    /// Money flowing out of the account.
    Expense,
}

impl PostingKind {
    /// Returns the signed balance delta this posting applies for `amount`.
    #[must_use]
    pub fn signed_delta(self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

/// The account fields the ledger service needs for validation.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    /// Account ID.
    pub id: Uuid,
    /// Owner of the account.
    pub owner_id: Uuid,
    /// Account kind.
    pub kind: AccountKind,
    /// Currency code of the account.
    pub currency: String,
    /// Current balance.
    pub current_balance: Decimal,
    /// Whether the account accepts postings.
    pub is_active: bool,
}

/// A validated posting ready for atomic persistence.
///
/// `balance_delta` is the signed amount the owning account's balance must be
/// adjusted by in the same database transaction that stores the posting.
#[derive(Debug, Clone)]
pub struct PostingDraft {
    /// Account to post against.
    pub account_id: Uuid,
    /// Direction of the posting.
    pub kind: PostingKind,
    /// Positive amount in the account's currency.
    pub amount: Decimal,
    /// Optional category.
    pub category_id: Option<Uuid>,
    /// Free-text description.
    pub description: Option<String>,
    /// Business date of the posting.
    pub date: NaiveDate,
    /// Signed balance adjustment to apply atomically with the posting write.
    pub balance_delta: Decimal,
}

/// Resolved amounts for a cross-currency transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResolution {
    /// Amount leaving the source account, in its currency.
    pub source_amount: Decimal,
    /// Amount arriving at the destination account, in its currency.
    pub dest_amount: Decimal,
    /// Exchange rate applied, when currencies differ.
    pub rate: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_credit_line_kinds() {
        assert!(AccountKind::CreditCard.is_credit_line());
        assert!(AccountKind::Loan.is_credit_line());
        assert!(!AccountKind::Bank.is_credit_line());
        assert!(!AccountKind::Cash.is_credit_line());
        assert!(!AccountKind::EWallet.is_credit_line());
        assert!(!AccountKind::Investment.is_credit_line());
        assert!(!AccountKind::Other.is_credit_line());
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(PostingKind::Income.signed_delta(dec!(100)), dec!(100));
        assert_eq!(PostingKind::Expense.signed_delta(dec!(100)), dec!(-100));
    }
}
