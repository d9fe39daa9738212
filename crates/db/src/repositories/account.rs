//! Account repository.
//!
//! Owns the balance-adjustment primitive: every caller that writes a posting
//! adjusts the balance through [`adjust_balance`] inside the same database
//! transaction, keeping `current_balance` in lock-step with stored postings.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use savora_core::ledger::{AccountSnapshot, LedgerError, LedgerService};
use savora_core::matching::{match_account, MatchCandidate};

use crate::entities::{accounts, sea_orm_active_enums::AccountKind, transactions};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found for this owner.
    #[error("Account not found: {0}")]
    NotFound(Uuid),

    /// Cannot delete an account that postings still reference.
    #[error("Cannot delete account: {0} postings reference it")]
    HasPostings(u64),

    /// Domain rule violation from the ledger service.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning user.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Account kind.
    pub kind: AccountKind,
    /// Currency code.
    pub currency: String,
    /// Opening balance; `current_balance` starts equal to it.
    pub initial_balance: Decimal,
    /// Exclude from net-worth totals.
    pub exclude_from_totals: bool,
}

/// Input for updating an account.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// Display name.
    pub name: Option<String>,
    /// Active flag.
    pub is_active: Option<bool>,
    /// Exclude from net-worth totals.
    pub exclude_from_totals: Option<bool>,
}

/// Result of replaying postings against the stored balance.
#[derive(Debug, Clone)]
pub struct BalanceDrift {
    /// Account checked.
    pub account_id: Uuid,
    /// Balance as stored before the check.
    pub stored: Decimal,
    /// Balance recomputed from initial balance plus postings.
    pub recomputed: Decimal,
    /// Whether the stored balance was corrected.
    pub corrected: bool,
}

/// Account repository for CRUD and balance maintenance.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account with `current_balance = initial_balance`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let now = chrono::Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id),
            name: Set(input.name),
            kind: Set(input.kind),
            currency: Set(input.currency),
            initial_balance: Set(input.initial_balance),
            current_balance: Set(input.initial_balance),
            exclude_from_totals: Set(input.exclude_from_totals),
            is_default_payment: Set(false),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account = account.insert(&self.db).await?;
        Ok(account)
    }

    /// Lists a user's accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<accounts::Model>, AccountError> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_desc(accounts::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(accounts)
    }

    /// Finds one of the user's accounts by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_account(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<accounts::Model>, AccountError> {
        let account = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(account)
    }

    /// Updates mutable account fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist for this user.
    pub async fn update_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let account = self
            .find_account(user_id, id)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let mut active: accounts::ActiveModel = account.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(exclude) = input.exclude_from_totals {
            active.exclude_from_totals = Set(exclude);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Makes this the user's only default-payment account.
    ///
    /// Clearing the flag on every other account and setting it here happen in
    /// one transaction so the at-most-one invariant holds at every commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist for this user.
    pub async fn set_default_payment(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<accounts::Model, AccountError> {
        let txn = self.db.begin().await?;

        let account = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        accounts::Entity::update_many()
            .col_expr(
                accounts::Column::IsDefaultPayment,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Id.ne(id))
            .exec(&txn)
            .await?;

        let mut active: accounts::ActiveModel = account.into();
        active.is_default_payment = Set(true);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes an account, refusing while postings still reference it.
    ///
    /// # Errors
    ///
    /// Returns `HasPostings` when any posting references the account.
    pub async fn delete_account(&self, user_id: Uuid, id: Uuid) -> Result<(), AccountError> {
        let account = self
            .find_account(user_id, id)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let posting_count = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(id))
            .count(&self.db)
            .await?;
        if posting_count > 0 {
            return Err(AccountError::HasPostings(posting_count));
        }

        accounts::Entity::delete_by_id(account.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Resolves a free-text account hint against the user's active accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn match_hint(
        &self,
        user_id: Uuid,
        hint: &str,
    ) -> Result<Option<accounts::Model>, AccountError> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        let candidates: Vec<MatchCandidate> = accounts
            .iter()
            .map(|a| MatchCandidate {
                id: a.id,
                name: a.name.clone(),
            })
            .collect();

        let matched = match_account(hint, &candidates).map(|c| c.id);
        Ok(matched.and_then(|id| accounts.into_iter().find(|a| a.id == id)))
    }

    /// Recomputes the balance by replaying postings and corrects drift.
    ///
    /// The account row is locked for the duration so concurrent posting
    /// writes cannot interleave with the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist for this user.
    pub async fn recompute_balance(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<BalanceDrift, AccountError> {
        let txn = self.db.begin().await?;

        let account = accounts::Entity::find_by_id(id)
            .filter(accounts::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let postings = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(id))
            .all(&txn)
            .await?;

        let recomputed = LedgerService::recompute_balance(
            account.initial_balance,
            postings.iter().map(|p| (p.kind.into(), p.amount)),
        );

        let stored = account.current_balance;
        let corrected = stored != recomputed;
        if corrected {
            tracing::warn!(
                account_id = %id,
                %stored,
                %recomputed,
                "balance drift detected, correcting"
            );
            let mut active: accounts::ActiveModel = account.into();
            active.current_balance = Set(recomputed);
            active.updated_at = Set(chrono::Utc::now().into());
            active.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(BalanceDrift {
            account_id: id,
            stored,
            recomputed,
            corrected,
        })
    }
}

/// Loads an account inside a transaction, locked against concurrent writers.
pub(crate) async fn load_locked(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find_by_id(id)
        .filter(accounts::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await
}

/// Applies a signed delta to an account's stored balance.
///
/// Must run inside the same transaction as the posting write that caused it;
/// that pairing is what keeps the balance invariant structural rather than
/// compensated.
pub(crate) async fn adjust_balance(
    txn: &DatabaseTransaction,
    account: accounts::Model,
    delta: Decimal,
) -> Result<accounts::Model, DbErr> {
    let new_balance = account.current_balance + delta;
    let mut active: accounts::ActiveModel = account.into();
    active.current_balance = Set(new_balance);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(txn).await
}

/// Projects an account row into the pure ledger snapshot.
pub(crate) fn snapshot(account: &accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        id: account.id,
        owner_id: account.user_id,
        kind: account.kind.clone().into(),
        currency: account.currency.clone(),
        current_balance: account.current_balance,
        is_active: account.is_active,
    }
}

// ============================================================================
// Pure functions for property testing
// ============================================================================

/// Simulates the default-payment switch over a user's accounts.
///
/// Returns the flags after designating `target` as the default.
#[must_use]
pub fn simulate_default_payment(flags: &[(Uuid, bool)], target: Uuid) -> Vec<(Uuid, bool)> {
    flags
        .iter()
        .map(|(id, _)| (*id, *id == target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// After designating any account, at most one flag is set, and it is
        /// the designated account's.
        #[test]
        fn prop_at_most_one_default_payment(
            ids in prop::collection::vec(any::<u128>(), 1..10),
            initial_flags in prop::collection::vec(any::<bool>(), 1..10),
            target_index in any::<prop::sample::Index>(),
        ) {
            let flags: Vec<(Uuid, bool)> = ids
                .iter()
                .zip(initial_flags.iter().cycle())
                .map(|(bits, flag)| (Uuid::from_u128(*bits), *flag))
                .collect();
            let target = flags[target_index.index(flags.len())].0;

            let after = simulate_default_payment(&flags, target);

            let set: Vec<&(Uuid, bool)> = after.iter().filter(|(_, f)| *f).collect();
            prop_assert!(set.len() <= 1);
            for (id, flag) in &after {
                if *flag {
                    prop_assert_eq!(*id, target);
                }
            }
        }
    }

    #[test]
    fn test_default_payment_switch_moves_flag() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let flags = vec![(a, true), (b, false)];

        let after = simulate_default_payment(&flags, b);
        assert_eq!(after, vec![(a, false), (b, true)]);
    }
}
