//! Savings goal repository.
//!
//! Every mutation recomputes the goal's `current_amount` from its stored
//! contributions and re-evaluates completion inside the same transaction,
//! so the cached aggregate and the status can never drift apart.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use savora_core::ledger::{LedgerError, LedgerService};
use savora_core::savings::{
    current_amount, evaluate_completion, validate_cancel, validate_contribution, validate_pause,
    validate_resume, validate_withdrawal, ContributionView,
    SavingsError as SavingsDomainError,
};

use crate::entities::{
    savings_contributions, savings_goals,
    sea_orm_active_enums::{ContributionKind, GoalStatus},
    transactions,
};
use crate::repositories::account::{adjust_balance, load_locked, snapshot};
use crate::repositories::transaction::insert_posting;

/// Error types for savings goal operations.
#[derive(Debug, thiserror::Error)]
pub enum SavingsError {
    /// Goal not found for this owner.
    #[error("Savings goal not found: {0}")]
    NotFound(Uuid),

    /// Contribution not found for this owner.
    #[error("Contribution not found: {0}")]
    ContributionNotFound(Uuid),

    /// Transaction not found for this owner.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Account not found for this owner.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// The linked transaction belongs to a different owner.
    #[error("Transaction does not belong to the goal's owner")]
    AccountMismatch,

    /// Domain rule violation from the savings engine.
    #[error(transparent)]
    Domain(#[from] SavingsDomainError),

    /// Domain rule violation from the ledger service.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a savings goal.
#[derive(Debug, Clone)]
pub struct CreateGoalInput {
    /// Owning user.
    pub user_id: Uuid,
    /// Optional real account the goal's money lives in.
    pub account_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Display icon.
    pub icon: Option<String>,
    /// Display color.
    pub color: Option<String>,
    /// Target amount to reach.
    pub target_amount: Decimal,
    /// Currency of the target.
    pub currency: String,
    /// Optional date the user wants to reach the target by.
    pub target_date: Option<NaiveDate>,
}

/// Savings goal repository.
#[derive(Debug, Clone)]
pub struct SavingsRepository {
    db: DatabaseConnection,
}

impl SavingsRepository {
    /// Creates a new savings goal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an active goal with a zero current amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_goal(
        &self,
        input: CreateGoalInput,
    ) -> Result<savings_goals::Model, SavingsError> {
        let now = chrono::Utc::now().into();
        let goal = savings_goals::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id),
            account_id: Set(input.account_id),
            name: Set(input.name),
            description: Set(input.description),
            icon: Set(input.icon),
            color: Set(input.color),
            target_amount: Set(input.target_amount),
            current_amount: Set(Decimal::ZERO),
            currency: Set(input.currency),
            target_date: Set(input.target_date),
            status: Set(GoalStatus::Active),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let goal = goal.insert(&self.db).await?;
        Ok(goal)
    }

    /// Lists a user's goals.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_goals(&self, user_id: Uuid) -> Result<Vec<savings_goals::Model>, SavingsError> {
        let goals = savings_goals::Entity::find()
            .filter(savings_goals::Column::UserId.eq(user_id))
            .order_by_desc(savings_goals::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(goals)
    }

    /// Finds one of the user's goals by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<savings_goals::Model>, SavingsError> {
        let goal = savings_goals::Entity::find_by_id(id)
            .filter(savings_goals::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(goal)
    }

    /// Adds a manual contribution and re-evaluates completion.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive amounts or a cancelled goal.
    pub async fn add_contribution(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        amount: Decimal,
        date: NaiveDate,
        notes: Option<String>,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;
        let goal = load_goal_locked(&txn, user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_contribution(goal.status.into(), amount)?;

        insert_contribution(
            &txn,
            goal_id,
            None,
            amount,
            &goal.currency,
            date,
            notes,
            ContributionKind::Manual,
        )
        .await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Withdraws from a goal, reverting completion if the balance drops
    /// below target.
    ///
    /// # Errors
    ///
    /// Returns `ExceedsBalance` when the withdrawal is larger than what the
    /// goal holds.
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        amount: Decimal,
        date: NaiveDate,
        notes: Option<String>,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;
        let goal = load_goal_locked(&txn, user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_withdrawal(goal.status.into(), goal.current_amount, amount)?;

        insert_contribution(
            &txn,
            goal_id,
            None,
            -amount,
            &goal.currency,
            date,
            notes,
            ContributionKind::Manual,
        )
        .await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Moves money from a real account into a goal as one atomic unit:
    /// expense posting, balance adjustment, and linked contribution.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` when the account cannot cover the amount.
    pub async fn transfer_to_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        from_account_id: Uuid,
        amount: Decimal,
        date: NaiveDate,
        notes: Option<String>,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;
        let goal = load_goal_locked(&txn, user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_contribution(goal.status.into(), amount)?;

        let account = load_locked(&txn, user_id, from_account_id)
            .await?
            .ok_or(SavingsError::AccountNotFound(from_account_id))?;
        let draft = LedgerService::prepare_expense(
            &snapshot(&account),
            amount,
            None,
            Some(format!("Savings: {}", goal.name)),
            date,
        )?;
        let posting = insert_posting(&txn, &draft, None, None, None).await?;
        adjust_balance(&txn, account, draft.balance_delta).await?;

        insert_contribution(
            &txn,
            goal_id,
            Some(posting.id),
            amount,
            &goal.currency,
            date,
            notes,
            ContributionKind::Linked,
        )
        .await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Wraps an existing posting as a linked contribution.
    ///
    /// # Errors
    ///
    /// Returns `AccountMismatch` when the posting's account does not belong
    /// to the goal's owner.
    pub async fn link_transaction(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;
        let goal = load_goal_locked(&txn, user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;

        let posting = transactions::Entity::find_by_id(transaction_id)
            .one(&txn)
            .await?
            .ok_or(SavingsError::TransactionNotFound(transaction_id))?;
        let owned = load_locked(&txn, user_id, posting.account_id).await?.is_some();
        if !owned {
            return Err(SavingsError::AccountMismatch);
        }
        validate_contribution(goal.status.into(), posting.amount)?;

        insert_contribution(
            &txn,
            goal_id,
            Some(posting.id),
            posting.amount,
            &goal.currency,
            posting.transaction_date,
            None,
            ContributionKind::Linked,
        )
        .await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a contribution row (never the underlying posting) and
    /// re-evaluates the goal, including the revert-on-shortfall rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the contribution does not exist for this user.
    pub async fn unlink_contribution(
        &self,
        user_id: Uuid,
        contribution_id: Uuid,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;

        let contribution = savings_contributions::Entity::find_by_id(contribution_id)
            .one(&txn)
            .await?
            .ok_or(SavingsError::ContributionNotFound(contribution_id))?;
        let goal = load_goal_locked(&txn, user_id, contribution.goal_id)
            .await?
            .ok_or(SavingsError::ContributionNotFound(contribution_id))?;

        savings_contributions::Entity::delete_by_id(contribution.id)
            .exec(&txn)
            .await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Lists a goal's contributions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the goal does not exist for this user.
    pub async fn list_contributions(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<Vec<savings_contributions::Model>, SavingsError> {
        let goal = self
            .find_goal(user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;

        let contributions = savings_contributions::Entity::find()
            .filter(savings_contributions::Column::GoalId.eq(goal.id))
            .order_by_desc(savings_contributions::Column::ContributionDate)
            .all(&self.db)
            .await?;
        Ok(contributions)
    }

    /// Pauses an active goal.
    ///
    /// # Errors
    ///
    /// Returns an error unless the goal is active.
    pub async fn pause_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<savings_goals::Model, SavingsError> {
        let goal = self
            .find_goal(user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_pause(goal.status.into())?;

        let mut active: savings_goals::ActiveModel = goal.into();
        active.status = Set(GoalStatus::Paused);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Resumes a paused goal, re-checking completion against the current
    /// amount rather than blindly re-firing the completed event.
    ///
    /// # Errors
    ///
    /// Returns an error unless the goal is paused.
    pub async fn resume_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<savings_goals::Model, SavingsError> {
        let txn = self.db.begin().await?;
        let goal = load_goal_locked(&txn, user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_resume(goal.status.into())?;

        let mut active: savings_goals::ActiveModel = goal.into();
        active.status = Set(GoalStatus::Active);
        active.updated_at = Set(chrono::Utc::now().into());
        let goal = active.update(&txn).await?;

        let updated = reevaluate(&txn, goal).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Cancels an active or paused goal.
    ///
    /// # Errors
    ///
    /// Returns an error for completed or already-cancelled goals.
    pub async fn cancel_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
    ) -> Result<savings_goals::Model, SavingsError> {
        let goal = self
            .find_goal(user_id, goal_id)
            .await?
            .ok_or(SavingsError::NotFound(goal_id))?;
        validate_cancel(goal.status.into())?;

        let mut active: savings_goals::ActiveModel = goal.into();
        active.status = Set(GoalStatus::Cancelled);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&self.db).await?;
        Ok(updated)
    }
}

async fn load_goal_locked(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<savings_goals::Model>, DbErr> {
    savings_goals::Entity::find_by_id(id)
        .filter(savings_goals::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await
}

#[allow(clippy::too_many_arguments)]
async fn insert_contribution(
    txn: &DatabaseTransaction,
    goal_id: Uuid,
    transaction_id: Option<Uuid>,
    amount: Decimal,
    currency: &str,
    date: NaiveDate,
    notes: Option<String>,
    kind: ContributionKind,
) -> Result<savings_contributions::Model, DbErr> {
    let contribution = savings_contributions::ActiveModel {
        id: Set(Uuid::now_v7()),
        goal_id: Set(goal_id),
        transaction_id: Set(transaction_id),
        amount: Set(amount),
        currency: Set(currency.to_string()),
        contribution_date: Set(date),
        notes: Set(notes),
        kind: Set(kind),
        created_at: Set(chrono::Utc::now().into()),
    };
    contribution.insert(txn).await
}

/// Recomputes the goal's aggregate from contributions and applies the
/// completion evaluation, logging the completed event exactly when the
/// evaluation transitions the goal into completed.
async fn reevaluate(
    txn: &DatabaseTransaction,
    goal: savings_goals::Model,
) -> Result<savings_goals::Model, SavingsError> {
    let contributions = savings_contributions::Entity::find()
        .filter(savings_contributions::Column::GoalId.eq(goal.id))
        .all(txn)
        .await?;
    let views: Vec<ContributionView> = contributions
        .iter()
        .map(|c| ContributionView {
            amount: c.amount,
            date: c.contribution_date,
        })
        .collect();
    let current = current_amount(&views);

    let outcome = evaluate_completion(
        goal.status.into(),
        goal.completed_at.map(Into::into),
        current,
        goal.target_amount,
        chrono::Utc::now(),
    );
    if outcome.newly_completed {
        tracing::info!(goal_id = %goal.id, %current, "savings goal completed");
    }

    let mut active: savings_goals::ActiveModel = goal.into();
    active.current_amount = Set(current);
    active.status = Set(outcome.status.into());
    active.completed_at = Set(outcome.completed_at.map(Into::into));
    active.updated_at = Set(chrono::Utc::now().into());
    let updated = active.update(txn).await?;
    Ok(updated)
}
