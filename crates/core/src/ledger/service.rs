//! Ledger service: posting validation and balance arithmetic.
//!
//! The service is pure. Persistence (and the atomicity of posting write +
//! balance adjustment) is owned by the repository layer, which calls these
//! functions to decide what to write.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{AccountSnapshot, PostingDraft, PostingKind, TransferResolution};
use crate::currency::convert_amount;

/// Decimal places carried on posting amounts.
pub const AMOUNT_SCALE: u32 = 4;

/// Ledger service for posting validation and resolution.
pub struct LedgerService;

impl LedgerService {
    /// Validates that a posting amount is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` for zero or negative amounts.
    pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        Ok(())
    }

    /// Builds an income posting draft against `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive or the account is
    /// inactive.
    pub fn prepare_income(
        account: &AccountSnapshot,
        amount: Decimal,
        category_id: Option<Uuid>,
        description: Option<String>,
        date: NaiveDate,
    ) -> Result<PostingDraft, LedgerError> {
        Self::validate_amount(amount)?;
        Self::ensure_active(account)?;

        Ok(PostingDraft {
            account_id: account.id,
            kind: PostingKind::Income,
            amount,
            category_id,
            description,
            date,
            balance_delta: amount,
        })
    }

    /// Builds an expense posting draft against `account`.
    ///
    /// Non-credit-line accounts must be able to cover the amount. Credit-line
    /// accounts (credit card, loan) may go negative; limit checking is a
    /// reporting concern, not enforced here.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the account is
    /// inactive, or funds are insufficient.
    pub fn prepare_expense(
        account: &AccountSnapshot,
        amount: Decimal,
        category_id: Option<Uuid>,
        description: Option<String>,
        date: NaiveDate,
    ) -> Result<PostingDraft, LedgerError> {
        Self::validate_amount(amount)?;
        Self::ensure_active(account)?;
        Self::check_sufficient_funds(account, amount)?;

        Ok(PostingDraft {
            account_id: account.id,
            kind: PostingKind::Expense,
            amount,
            category_id,
            description,
            date,
            balance_delta: -amount,
        })
    }

    /// Checks that a non-credit-line account can cover `amount`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InsufficientFunds` when the balance is short.
    pub fn check_sufficient_funds(
        account: &AccountSnapshot,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        if account.kind.is_credit_line() {
            return Ok(());
        }
        if account.current_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                available: account.current_balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Resolves the per-side amounts of a transfer.
    ///
    /// The funds check runs against the source account in its own currency,
    /// before any conversion. When currencies differ the destination amount
    /// is converted through `rate_lookup`; a missing rate is a hard failure
    /// because the caller explicitly requested the conversion.
    ///
    /// # Errors
    ///
    /// Returns an error on same-account transfers, non-positive amounts,
    /// insufficient source funds, or a missing exchange rate.
    pub fn resolve_transfer<F>(
        source: &AccountSnapshot,
        dest: &AccountSnapshot,
        amount: Decimal,
        rate_lookup: F,
    ) -> Result<TransferResolution, LedgerError>
    where
        F: Fn(&str, &str) -> Option<Decimal>,
    {
        if source.id == dest.id {
            return Err(LedgerError::SameAccountTransfer);
        }
        Self::validate_amount(amount)?;
        Self::ensure_active(source)?;
        Self::ensure_active(dest)?;
        Self::check_sufficient_funds(source, amount)?;

        if source.currency == dest.currency {
            return Ok(TransferResolution {
                source_amount: amount,
                dest_amount: amount,
                rate: None,
            });
        }

        let rate = rate_lookup(&source.currency, &dest.currency).ok_or_else(|| {
            LedgerError::RateUnavailable {
                from: source.currency.clone(),
                to: dest.currency.clone(),
            }
        })?;

        Ok(TransferResolution {
            source_amount: amount,
            dest_amount: convert_amount(amount, rate, AMOUNT_SCALE),
            rate: Some(rate),
        })
    }

    /// Signed balance delta for editing a posting's amount in place.
    ///
    /// The caller applies this via the balance-adjustment primitive in the
    /// same atomic unit as the field update.
    #[must_use]
    pub fn edit_delta(kind: PostingKind, old_amount: Decimal, new_amount: Decimal) -> Decimal {
        kind.signed_delta(new_amount) - kind.signed_delta(old_amount)
    }

    /// Signed balance delta that reverses a stored posting.
    #[must_use]
    pub fn reversal_delta(kind: PostingKind, amount: Decimal) -> Decimal {
        -kind.signed_delta(amount)
    }

    /// Derived amount owed on a credit-line account.
    #[must_use]
    pub fn amount_owed(initial_balance: Decimal, current_balance: Decimal) -> Decimal {
        (initial_balance - current_balance).max(Decimal::ZERO)
    }

    /// Replays postings to recompute a balance from scratch.
    ///
    /// Used by reconciliation jobs to detect drift between the incrementally
    /// maintained balance and the sum of stored postings.
    #[must_use]
    pub fn recompute_balance<I>(initial_balance: Decimal, postings: I) -> Decimal
    where
        I: IntoIterator<Item = (PostingKind, Decimal)>,
    {
        postings
            .into_iter()
            .fold(initial_balance, |acc, (kind, amount)| {
                acc + kind.signed_delta(amount)
            })
    }

    /// Validates that a posting can be reconciled.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AlreadyReconciled` if a timestamp is already set.
    pub fn validate_can_reconcile(
        transaction_id: Uuid,
        reconciled_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        if reconciled_at.is_some() {
            return Err(LedgerError::AlreadyReconciled(transaction_id));
        }
        Ok(())
    }

    fn ensure_active(account: &AccountSnapshot) -> Result<(), LedgerError> {
        if !account.is_active {
            return Err(LedgerError::AccountInactive(account.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::AccountKind;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn account(kind: AccountKind, balance: Decimal, currency: &str) -> AccountSnapshot {
        AccountSnapshot {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            kind,
            currency: currency.to_string(),
            current_balance: balance,
            is_active: true,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_income_draft() {
        let acc = account(AccountKind::Bank, dec!(1000), "VND");
        let draft =
            LedgerService::prepare_income(&acc, dec!(500), None, None, date(2025, 1, 10)).unwrap();
        assert_eq!(draft.kind, PostingKind::Income);
        assert_eq!(draft.balance_delta, dec!(500));
    }

    #[test]
    fn test_income_rejects_non_positive() {
        let acc = account(AccountKind::Bank, dec!(1000), "VND");
        let result = LedgerService::prepare_income(&acc, dec!(0), None, None, date(2025, 1, 10));
        assert!(matches!(result, Err(LedgerError::NonPositiveAmount(_))));

        let result = LedgerService::prepare_income(&acc, dec!(-5), None, None, date(2025, 1, 10));
        assert!(matches!(result, Err(LedgerError::NonPositiveAmount(_))));
    }

    #[test]
    fn test_expense_insufficient_funds() {
        let acc = account(AccountKind::Cash, dec!(100), "VND");
        let result = LedgerService::prepare_expense(&acc, dec!(150), None, None, date(2025, 1, 10));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                available,
                requested,
            }) if available == dec!(100) && requested == dec!(150)
        ));
    }

    #[test]
    fn test_credit_line_may_go_negative() {
        let acc = account(AccountKind::CreditCard, dec!(100), "VND");
        let draft =
            LedgerService::prepare_expense(&acc, dec!(500), None, None, date(2025, 1, 10)).unwrap();
        assert_eq!(draft.balance_delta, dec!(-500));
    }

    #[test]
    fn test_inactive_account_rejected() {
        let mut acc = account(AccountKind::Bank, dec!(1000), "VND");
        acc.is_active = false;
        let result = LedgerService::prepare_income(&acc, dec!(10), None, None, date(2025, 1, 10));
        assert!(matches!(result, Err(LedgerError::AccountInactive(_))));
    }

    #[test]
    fn test_transfer_same_currency() {
        // Spec scenario: A (VND, 1,000,000) transfers 200,000 to B (VND).
        let a = account(AccountKind::Bank, dec!(1000000), "VND");
        let b = account(AccountKind::Bank, dec!(0), "VND");

        let resolution =
            LedgerService::resolve_transfer(&a, &b, dec!(200000), |_, _| None).unwrap();
        assert_eq!(resolution.source_amount, dec!(200000));
        assert_eq!(resolution.dest_amount, dec!(200000));
        assert_eq!(resolution.rate, None);
    }

    #[test]
    fn test_transfer_cross_currency() {
        let a = account(AccountKind::Bank, dec!(1000), "USD");
        let b = account(AccountKind::Bank, dec!(0), "VND");

        let resolution =
            LedgerService::resolve_transfer(&a, &b, dec!(100), |_, _| Some(dec!(25000))).unwrap();
        assert_eq!(resolution.source_amount, dec!(100));
        assert_eq!(resolution.dest_amount, dec!(2500000.0000));
        assert_eq!(resolution.rate, Some(dec!(25000)));
    }

    #[test]
    fn test_transfer_missing_rate_is_hard_failure() {
        let a = account(AccountKind::Bank, dec!(1000), "USD");
        let b = account(AccountKind::Bank, dec!(0), "VND");

        let result = LedgerService::resolve_transfer(&a, &b, dec!(100), |_, _| None);
        assert!(matches!(result, Err(LedgerError::RateUnavailable { .. })));
    }

    #[test]
    fn test_transfer_funds_checked_in_source_currency() {
        // Funds check happens before conversion, against the source balance.
        let a = account(AccountKind::Bank, dec!(50), "USD");
        let b = account(AccountKind::Bank, dec!(0), "VND");

        let result = LedgerService::resolve_transfer(&a, &b, dec!(100), |_, _| Some(dec!(25000)));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_transfer_to_same_account_rejected() {
        let a = account(AccountKind::Bank, dec!(1000), "VND");
        let result = LedgerService::resolve_transfer(&a, &a.clone(), dec!(10), |_, _| None);
        assert!(matches!(result, Err(LedgerError::SameAccountTransfer)));
    }

    #[test]
    fn test_edit_delta() {
        // Income 100 -> 150 raises the balance by 50.
        assert_eq!(
            LedgerService::edit_delta(PostingKind::Income, dec!(100), dec!(150)),
            dec!(50)
        );
        // Expense 100 -> 150 lowers the balance by 50 more.
        assert_eq!(
            LedgerService::edit_delta(PostingKind::Expense, dec!(100), dec!(150)),
            dec!(-50)
        );
        // Expense 150 -> 100 gives 50 back.
        assert_eq!(
            LedgerService::edit_delta(PostingKind::Expense, dec!(150), dec!(100)),
            dec!(50)
        );
    }

    #[test]
    fn test_reversal_delta() {
        assert_eq!(
            LedgerService::reversal_delta(PostingKind::Income, dec!(100)),
            dec!(-100)
        );
        assert_eq!(
            LedgerService::reversal_delta(PostingKind::Expense, dec!(100)),
            dec!(100)
        );
    }

    #[test]
    fn test_amount_owed() {
        assert_eq!(LedgerService::amount_owed(dec!(5000), dec!(3000)), dec!(2000));
        assert_eq!(LedgerService::amount_owed(dec!(5000), dec!(6000)), dec!(0));
    }

    #[test]
    fn test_validate_can_reconcile() {
        let id = Uuid::new_v4();
        assert!(LedgerService::validate_can_reconcile(id, None).is_ok());
        assert!(matches!(
            LedgerService::validate_can_reconcile(id, Some(Utc::now())),
            Err(LedgerError::AlreadyReconciled(_))
        ));
    }

    // ========================================================================
    // Balance invariant: current == initial + sum of signed posting amounts
    // ========================================================================

    fn posting_strategy() -> impl Strategy<Value = (PostingKind, Decimal)> {
        (any::<bool>(), 1i64..10_000_000i64).prop_map(|(income, cents)| {
            let kind = if income {
                PostingKind::Income
            } else {
                PostingKind::Expense
            };
            (kind, Decimal::new(cents, 2))
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any sequence of postings, replaying them from the initial
        /// balance reproduces the incrementally maintained balance.
        #[test]
        fn prop_balance_equals_initial_plus_signed_sum(
            initial_cents in -1_000_000i64..1_000_000i64,
            postings in prop::collection::vec(posting_strategy(), 0..40),
        ) {
            let initial = Decimal::new(initial_cents, 2);

            // Incremental maintenance, as the repository does it.
            let mut incremental = initial;
            for (kind, amount) in &postings {
                incremental += kind.signed_delta(*amount);
            }

            // Replay, as the reconciliation job does it.
            let replayed =
                LedgerService::recompute_balance(initial, postings.iter().copied());

            prop_assert_eq!(incremental, replayed);
        }

        /// Editing a posting amount then editing it back is a no-op.
        #[test]
        fn prop_edit_roundtrip_is_neutral(
            old_cents in 1i64..1_000_000i64,
            new_cents in 1i64..1_000_000i64,
            income in any::<bool>(),
        ) {
            let kind = if income { PostingKind::Income } else { PostingKind::Expense };
            let old = Decimal::new(old_cents, 2);
            let new = Decimal::new(new_cents, 2);

            let there = LedgerService::edit_delta(kind, old, new);
            let back = LedgerService::edit_delta(kind, new, old);
            prop_assert_eq!(there + back, Decimal::ZERO);
        }

        /// A posting followed by its reversal leaves the balance unchanged.
        #[test]
        fn prop_reversal_cancels_posting(
            cents in 1i64..1_000_000i64,
            income in any::<bool>(),
        ) {
            let kind = if income { PostingKind::Income } else { PostingKind::Expense };
            let amount = Decimal::new(cents, 2);
            prop_assert_eq!(
                kind.signed_delta(amount) + LedgerService::reversal_delta(kind, amount),
                Decimal::ZERO
            );
        }
    }
}
