//! Transaction recorder.
//!
//! Every mutating operation pairs its posting write with the balance
//! adjustment in a single database transaction, so a partially applied
//! posting cannot exist. Transfers create both sides or neither.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use savora_core::currency::resolve_rate;
use savora_core::ledger::{LedgerError, LedgerService, PostingDraft};

use crate::entities::{accounts, sea_orm_active_enums::PostingKind, transactions};
use crate::repositories::account::{adjust_balance, load_locked, snapshot};
use crate::repositories::exchange_rate::load_quotes_for_pair;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Account not found for this owner.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Transaction not found for this owner.
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    /// Domain rule violation from the ledger service.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for recording an income or expense posting.
#[derive(Debug, Clone)]
pub struct RecordPostingInput {
    /// Owning user; every lookup is scoped to it.
    pub user_id: Uuid,
    /// Account the posting hits.
    pub account_id: Uuid,
    /// Positive amount in the account's currency.
    pub amount: Decimal,
    /// Optional category.
    pub category_id: Option<Uuid>,
    /// Free-text description.
    pub description: Option<String>,
    /// Transaction date.
    pub date: NaiveDate,
}

/// Both sides of a recorded transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Expense posting on the source account.
    pub source: transactions::Model,
    /// Income posting on the destination account.
    pub dest: transactions::Model,
    /// Rate used when the currencies differed.
    pub rate: Option<Decimal>,
}

/// A candidate record produced by an import parser.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    /// Posting direction.
    pub kind: PostingKind,
    /// Positive amount.
    pub amount: Decimal,
    /// Description from the source document.
    pub description: Option<String>,
    /// Date from the source document.
    pub date: NaiveDate,
    /// Category resolved by the import pipeline, if any.
    pub category_id: Option<Uuid>,
}

/// Input for editing a non-transfer posting.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostingInput {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New category (`Some(None)` clears it).
    pub category_id: Option<Option<Uuid>>,
    /// New description.
    pub description: Option<Option<String>>,
}

/// Transaction repository.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an income posting and raises the account balance.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown account, a non-positive amount, or an
    /// inactive account.
    pub async fn record_income(
        &self,
        input: RecordPostingInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let account = load_locked(&txn, input.user_id, input.account_id)
            .await?
            .ok_or(TransactionError::AccountNotFound(input.account_id))?;

        let draft = LedgerService::prepare_income(
            &snapshot(&account),
            input.amount,
            input.category_id,
            input.description,
            input.date,
        )?;

        let posting = insert_posting(&txn, &draft, None, None, None).await?;
        adjust_balance(&txn, account, draft.balance_delta).await?;

        txn.commit().await?;
        tracing::info!(transaction_id = %posting.id, "transaction created");
        Ok(posting)
    }

    /// Records an expense posting and lowers the account balance.
    ///
    /// Non-credit-line accounts must cover the amount; credit-line accounts
    /// may go negative.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` when a non-credit-line balance is short.
    pub async fn record_expense(
        &self,
        input: RecordPostingInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let account = load_locked(&txn, input.user_id, input.account_id)
            .await?
            .ok_or(TransactionError::AccountNotFound(input.account_id))?;

        let draft = LedgerService::prepare_expense(
            &snapshot(&account),
            input.amount,
            input.category_id,
            input.description,
            input.date,
        )?;

        let posting = insert_posting(&txn, &draft, None, None, None).await?;
        adjust_balance(&txn, account, draft.balance_delta).await?;

        txn.commit().await?;
        tracing::info!(transaction_id = %posting.id, "transaction created");
        Ok(posting)
    }

    /// Records a transfer as a linked expense/income pair.
    ///
    /// The funds check runs against the source account in its own currency;
    /// when currencies differ, the destination amount is converted and the
    /// resolved rate stored on both sides for audit. Both postings and both
    /// balance adjustments commit together or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error for same-account transfers, insufficient source
    /// funds, or a missing exchange rate.
    pub async fn record_transfer(
        &self,
        user_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
        date: NaiveDate,
    ) -> Result<TransferOutcome, TransactionError> {
        let txn = self.db.begin().await?;

        // Lock in a stable order so concurrent opposite-direction transfers
        // cannot deadlock.
        let (first, second) = if from_account_id <= to_account_id {
            (from_account_id, to_account_id)
        } else {
            (to_account_id, from_account_id)
        };
        let first_model = load_locked(&txn, user_id, first)
            .await?
            .ok_or(TransactionError::AccountNotFound(first))?;
        let second_model = load_locked(&txn, user_id, second)
            .await?
            .ok_or(TransactionError::AccountNotFound(second))?;
        let (source, dest) = if first == from_account_id {
            (first_model, second_model)
        } else {
            (second_model, first_model)
        };

        let quotes = load_quotes_for_pair(&txn, &source.currency, &dest.currency).await?;
        let resolution = LedgerService::resolve_transfer(
            &snapshot(&source),
            &snapshot(&dest),
            amount,
            |from, to| resolve_rate(&quotes, from, to, None).ok().map(|r| r.rate),
        )?;

        let source_draft = LedgerService::prepare_expense(
            &snapshot(&source),
            resolution.source_amount,
            None,
            description.clone(),
            date,
        )?;
        let dest_draft = LedgerService::prepare_income(
            &snapshot(&dest),
            resolution.dest_amount,
            None,
            description,
            date,
        )?;

        let converted = resolution.rate.map(|_| resolution.dest_amount);
        let source_posting =
            insert_posting(&txn, &source_draft, None, resolution.rate, converted).await?;
        let dest_posting = insert_posting(
            &txn,
            &dest_draft,
            Some(source_posting.id),
            resolution.rate,
            converted,
        )
        .await?;

        // Close the bidirectional link.
        let mut source_active: transactions::ActiveModel = source_posting.into();
        source_active.transfer_peer_id = Set(Some(dest_posting.id));
        let source_posting = source_active.update(&txn).await?;

        adjust_balance(&txn, source, source_draft.balance_delta).await?;
        adjust_balance(&txn, dest, dest_draft.balance_delta).await?;

        txn.commit().await?;
        tracing::info!(
            source_id = %source_posting.id,
            dest_id = %dest_posting.id,
            "transfer recorded"
        );
        Ok(TransferOutcome {
            source: source_posting,
            dest: dest_posting,
            rate: resolution.rate,
        })
    }

    /// Records an imported candidate, skipping duplicates.
    ///
    /// A candidate is a duplicate when a posting with the same account,
    /// date, amount, and description already exists; duplicates return
    /// `Ok(None)` without writing.
    ///
    /// # Errors
    ///
    /// Returns the same errors as direct income/expense recording.
    pub async fn record_candidate(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        candidate: CandidateRecord,
    ) -> Result<Option<transactions::Model>, TransactionError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::TransactionDate.eq(candidate.date))
            .filter(transactions::Column::Amount.eq(candidate.amount));
        query = match &candidate.description {
            Some(description) => {
                query.filter(transactions::Column::Description.eq(description.clone()))
            }
            None => query.filter(transactions::Column::Description.is_null()),
        };
        if query.one(&self.db).await?.is_some() {
            tracing::debug!(%account_id, date = %candidate.date, "duplicate candidate skipped");
            return Ok(None);
        }

        let input = RecordPostingInput {
            user_id,
            account_id,
            amount: candidate.amount,
            category_id: candidate.category_id,
            description: candidate.description,
            date: candidate.date,
        };
        let posting = match candidate.kind {
            PostingKind::Income => self.record_income(input).await?,
            PostingKind::Expense => self.record_expense(input).await?,
        };
        Ok(Some(posting))
    }

    /// Stamps a posting as reconciled.
    ///
    /// The stamp is a conditional update filtered on the timestamp still
    /// being unset, so of two concurrent reconciles exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReconciled` when a timestamp is already set.
    pub async fn reconcile(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        let posting = self.find_owned(user_id, id).await?;
        LedgerService::validate_can_reconcile(
            posting.id,
            posting.reconciled_at.map(Into::into),
        )?;

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let stamped = transactions::Entity::update_many()
            .col_expr(transactions::Column::ReconciledAt, Expr::value(Some(now)))
            .col_expr(transactions::Column::UpdatedAt, Expr::value(now))
            .filter(transactions::Column::Id.eq(posting.id))
            .filter(transactions::Column::ReconciledAt.is_null())
            .exec(&self.db)
            .await?;
        if stamped.rows_affected == 0 {
            return Err(TransactionError::Ledger(LedgerError::AlreadyReconciled(
                posting.id,
            )));
        }

        self.find_owned(user_id, id).await
    }

    /// Clears a posting's reconciliation timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the posting does not exist for this user.
    pub async fn unreconcile(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        let posting = self.find_owned(user_id, id).await?;

        let mut active: transactions::ActiveModel = posting.into();
        active.reconciled_at = Set(None);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Edits a non-transfer posting, re-deriving the balance delta for
    /// amount changes in the same transaction as the field update.
    ///
    /// The posting row is locked for the duration, so concurrent edits of
    /// the same posting serialize and each delta is derived from the amount
    /// the previous edit left behind.
    ///
    /// # Errors
    ///
    /// Returns `TransferImmutable` for transfer sides; callers delete and
    /// recreate those instead.
    pub async fn update_posting(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdatePostingInput,
    ) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;

        let posting = load_posting_locked(&txn, user_id, id).await?;
        if posting.transfer_peer_id.is_some() {
            return Err(TransactionError::Ledger(LedgerError::TransferImmutable));
        }

        if let Some(new_amount) = input.amount {
            LedgerService::validate_amount(new_amount)?;
            let delta = LedgerService::edit_delta(posting.kind.into(), posting.amount, new_amount);
            if delta != Decimal::ZERO {
                let account = load_locked(&txn, user_id, posting.account_id)
                    .await?
                    .ok_or(TransactionError::AccountNotFound(posting.account_id))?;
                adjust_balance(&txn, account, delta).await?;
            }
        }

        let mut active: transactions::ActiveModel = posting.into();
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        if let Some(date) = input.date {
            active.transaction_date = Set(date);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a posting, reversing its balance effect first.
    ///
    /// Deleting one side of a transfer reverses and deletes the linked side
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the posting does not exist for this user.
    pub async fn delete_posting(&self, user_id: Uuid, id: Uuid) -> Result<(), TransactionError> {
        let txn = self.db.begin().await?;

        // The peer is discovered from an unlocked read; the rows are then
        // locked in ascending id order so concurrent deletes of either
        // transfer side cannot deadlock. A posting that vanished between
        // the read and the lock surfaces as NotFound, never as a second
        // balance reversal.
        let peeked = find_owned_in(&txn, user_id, id).await?;
        let mut ids = vec![peeked.id];
        if let Some(peer_id) = peeked.transfer_peer_id {
            ids.push(peer_id);
        }
        ids.sort_unstable();

        for posting_id in ids {
            let posting = load_posting_locked(&txn, user_id, posting_id).await?;
            reverse_and_delete(&txn, user_id, posting).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Lists an account's postings, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_postings(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        // Scope through the account so a foreign account id yields nothing.
        let account = accounts::Entity::find_by_id(account_id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(TransactionError::AccountNotFound(account_id))?;

        let postings = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account.id))
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(postings)
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        let posting = transactions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(id))?;

        let owned = accounts::Entity::find_by_id(posting.account_id)
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .is_some();
        if !owned {
            return Err(TransactionError::NotFound(id));
        }
        Ok(posting)
    }
}

async fn find_owned_in(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    id: Uuid,
) -> Result<transactions::Model, TransactionError> {
    let posting = transactions::Entity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or(TransactionError::NotFound(id))?;

    let owned = accounts::Entity::find_by_id(posting.account_id)
        .filter(accounts::Column::UserId.eq(user_id))
        .one(txn)
        .await?
        .is_some();
    if !owned {
        return Err(TransactionError::NotFound(id));
    }
    Ok(posting)
}

/// Loads a posting under an exclusive row lock.
///
/// A locked read of a concurrently deleted row comes back empty, so the
/// lock doubles as the existence re-check for edit and delete paths.
async fn load_posting_locked(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    id: Uuid,
) -> Result<transactions::Model, TransactionError> {
    let posting = transactions::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(TransactionError::NotFound(id))?;

    let owned = accounts::Entity::find_by_id(posting.account_id)
        .filter(accounts::Column::UserId.eq(user_id))
        .one(txn)
        .await?
        .is_some();
    if !owned {
        return Err(TransactionError::NotFound(id));
    }
    Ok(posting)
}

async fn reverse_and_delete(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    posting: transactions::Model,
) -> Result<(), TransactionError> {
    let delta = LedgerService::reversal_delta(posting.kind.into(), posting.amount);
    let account = load_locked(txn, user_id, posting.account_id)
        .await?
        .ok_or(TransactionError::AccountNotFound(posting.account_id))?;
    adjust_balance(txn, account, delta).await?;

    // The delete must observe the row whose reversal was just applied;
    // anything else rolls the whole transaction back.
    let deleted = transactions::Entity::delete_by_id(posting.id).exec(txn).await?;
    if deleted.rows_affected == 0 {
        return Err(TransactionError::NotFound(posting.id));
    }
    Ok(())
}

/// Inserts a posting from a validated draft.
pub(crate) async fn insert_posting(
    txn: &DatabaseTransaction,
    draft: &PostingDraft,
    transfer_peer_id: Option<Uuid>,
    exchange_rate: Option<Decimal>,
    converted_amount: Option<Decimal>,
) -> Result<transactions::Model, DbErr> {
    let now = chrono::Utc::now().into();
    let posting = transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        account_id: Set(draft.account_id),
        kind: Set(draft.kind.into()),
        amount: Set(draft.amount),
        category_id: Set(draft.category_id),
        description: Set(draft.description.clone()),
        transaction_date: Set(draft.date),
        reconciled_at: Set(None),
        transfer_peer_id: Set(transfer_peer_id),
        exchange_rate: Set(exchange_rate),
        converted_amount: Set(converted_amount),
        created_at: Set(now),
        updated_at: Set(now),
    };
    posting.insert(txn).await
}

// ============================================================================
// Pure functions for property testing
// ============================================================================

/// Key an imported candidate is deduplicated on.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateKey {
    /// Posting date.
    pub date: NaiveDate,
    /// Posting amount.
    pub amount: Decimal,
    /// Posting description.
    pub description: Option<String>,
}

/// Whether a candidate collides with an already-stored posting on the same
/// account.
#[must_use]
pub fn is_duplicate_candidate(existing: &[CandidateKey], candidate: &CandidateKey) -> bool {
    existing.iter().any(|key| key == candidate)
}

/// One edit attempt against a shared posting row.
///
/// The balance delta is derived from the amount observed under the row
/// lock, so edits against the same row serialize: each one sees the amount
/// the previous edit left behind. Returns the balance after the attempt.
#[must_use]
pub fn attempt_edit(
    row: &mut Option<Decimal>,
    kind: PostingKind,
    balance: Decimal,
    new_amount: Decimal,
) -> Decimal {
    match row.as_mut() {
        Some(amount) => {
            let delta = LedgerService::edit_delta(kind.into(), *amount, new_amount);
            *amount = new_amount;
            balance + delta
        }
        None => balance,
    }
}

/// One delete attempt against a shared posting row.
///
/// The reversal applies only when the locked re-read still observes the
/// row; a worker that lost the race to a concurrent delete leaves the
/// balance untouched. Returns the balance after the attempt.
#[must_use]
pub fn attempt_delete(row: &mut Option<Decimal>, kind: PostingKind, balance: Decimal) -> Decimal {
    match row.take() {
        Some(amount) => balance + LedgerService::reversal_delta(kind.into(), amount),
        None => balance,
    }
}

/// One reconcile attempt against a shared timestamp slot. The stamp lands
/// only while the slot is empty.
#[must_use]
pub fn attempt_reconcile(
    reconciled_at: &mut Option<NaiveDate>,
    stamp: NaiveDate,
) -> bool {
    if reconciled_at.is_some() {
        return false;
    }
    *reconciled_at = Some(stamp);
    true
}

/// Applies both legs of a transfer to a pair of balances as one atomic
/// unit: when the destination leg fails, the already-applied source leg
/// rolls back with it and both balances come back unchanged.
#[must_use]
pub fn apply_transfer_atomic(
    source_balance: Decimal,
    dest_balance: Decimal,
    source_amount: Decimal,
    dest_amount: Decimal,
    dest_leg_succeeds: bool,
) -> (Decimal, Decimal) {
    let staged_source = source_balance - source_amount;
    let staged_dest = dest_balance + dest_amount;
    if dest_leg_succeeds {
        (staged_source, staged_dest)
    } else {
        (source_balance, dest_balance)
    }
}
