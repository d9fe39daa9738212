//! Recurring transaction repository.
//!
//! Wraps the pure date arithmetic in `savora-core`'s schedule module.
//! Firing a due definition claims it with a conditional update before the
//! generated posting is written, so concurrent sweeps cannot double-fire.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use savora_core::currency::{convert_amount, resolve_rate};
use savora_core::ledger::{LedgerError, LedgerService, AMOUNT_SCALE};
use savora_core::schedule::{
    advance_one_period, initial_next_run, is_due, preview, project_monthly, resume_catch_up,
    MonthlyProjection, Occurrence, RecurringView, Schedule, ScheduleError,
};

use crate::entities::{
    categories, recurring_transactions,
    sea_orm_active_enums::{self, PostingKind},
};
use crate::repositories::account::{adjust_balance, load_locked, snapshot};
use crate::repositories::exchange_rate::load_quotes_touching;
use crate::repositories::transaction::insert_posting;

/// Error types for recurring transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum RecurringError {
    /// Definition not found for this owner.
    #[error("Recurring transaction not found: {0}")]
    NotFound(Uuid),

    /// Account not found for this owner.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Invalid schedule fields.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Domain rule violation from the ledger service.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a recurring definition.
#[derive(Debug, Clone)]
pub struct CreateRecurringInput {
    /// Owning user.
    pub user_id: Uuid,
    /// Account the generated postings hit.
    pub account_id: Uuid,
    /// Category applied to generated postings.
    pub category_id: Option<Uuid>,
    /// Display name, also used as the posting description.
    pub name: String,
    /// Direction of generated postings.
    pub kind: PostingKind,
    /// Amount per occurrence.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
    /// Firing frequency.
    pub frequency: sea_orm_active_enums::Frequency,
    /// Weekday selector (0 = Monday) for weekly schedules.
    pub day_of_week: Option<i16>,
    /// Day-of-month selector.
    pub day_of_month: Option<i16>,
    /// Month selector for yearly schedules.
    pub month_of_year: Option<i16>,
    /// First possible firing date.
    pub start_date: NaiveDate,
    /// Optional last firing date (inclusive).
    pub end_date: Option<NaiveDate>,
    /// Generate postings automatically when due.
    pub auto_create: bool,
}

/// Input for updating a recurring definition.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecurringInput {
    /// Display name.
    pub name: Option<String>,
    /// Amount per occurrence.
    pub amount: Option<Decimal>,
    /// Category applied to generated postings.
    pub category_id: Option<Option<Uuid>>,
    /// Firing frequency.
    pub frequency: Option<sea_orm_active_enums::Frequency>,
    /// Weekday selector.
    pub day_of_week: Option<Option<i16>>,
    /// Day-of-month selector.
    pub day_of_month: Option<Option<i16>>,
    /// Month selector.
    pub month_of_year: Option<Option<i16>>,
    /// First possible firing date.
    pub start_date: Option<NaiveDate>,
    /// Optional last firing date.
    pub end_date: Option<Option<NaiveDate>>,
    /// Generate postings automatically when due.
    pub auto_create: Option<bool>,
}

/// A posting generated by the due sweep.
#[derive(Debug, Clone)]
pub struct FiredOccurrence {
    /// Definition that fired.
    pub recurring_id: Uuid,
    /// Generated posting.
    pub transaction_id: Uuid,
    /// Occurrence date the posting carries.
    pub date: NaiveDate,
}

/// Recurring transaction repository.
#[derive(Debug, Clone)]
pub struct RecurringRepository {
    db: DatabaseConnection,
}

impl RecurringRepository {
    /// Creates a new recurring transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a definition, seeding `next_run_date`.
    ///
    /// A future start date seeds as-is; otherwise the date advances period
    /// by period until it reaches today, so a definition created on its own
    /// start date is immediately due.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid schedule selectors or an unknown
    /// account.
    pub async fn create_recurring(
        &self,
        input: CreateRecurringInput,
    ) -> Result<recurring_transactions::Model, RecurringError> {
        let schedule = build_schedule(
            input.frequency,
            input.day_of_week,
            input.day_of_month,
            input.month_of_year,
            input.start_date,
            input.end_date,
        );
        schedule.validate()?;
        let next_run = initial_next_run(&schedule, chrono::Utc::now().date_naive());

        let now = chrono::Utc::now().into();
        let definition = recurring_transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(input.user_id),
            account_id: Set(input.account_id),
            category_id: Set(input.category_id),
            name: Set(input.name),
            kind: Set(input.kind),
            amount: Set(input.amount),
            currency: Set(input.currency),
            frequency: Set(input.frequency),
            day_of_week: Set(input.day_of_week),
            day_of_month: Set(input.day_of_month),
            month_of_year: Set(input.month_of_year),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            next_run_date: Set(next_run),
            last_run_date: Set(None),
            is_active: Set(true),
            auto_create: Set(input.auto_create),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let definition = definition.insert(&self.db).await?;
        Ok(definition)
    }

    /// Updates a definition, recomputing `next_run_date` from scratch when
    /// any schedule-affecting field changed.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid schedule selectors or an unknown
    /// definition.
    pub async fn update_recurring(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdateRecurringInput,
    ) -> Result<recurring_transactions::Model, RecurringError> {
        let definition = self
            .find_recurring(user_id, id)
            .await?
            .ok_or(RecurringError::NotFound(id))?;

        let frequency = input.frequency.unwrap_or(definition.frequency);
        let day_of_week = input.day_of_week.unwrap_or(definition.day_of_week);
        let day_of_month = input.day_of_month.unwrap_or(definition.day_of_month);
        let month_of_year = input.month_of_year.unwrap_or(definition.month_of_year);
        let start_date = input.start_date.unwrap_or(definition.start_date);
        let end_date = input.end_date.unwrap_or(definition.end_date);

        let schedule_changed = frequency != definition.frequency
            || day_of_week != definition.day_of_week
            || day_of_month != definition.day_of_month
            || month_of_year != definition.month_of_year
            || start_date != definition.start_date
            || end_date != definition.end_date;

        let schedule = build_schedule(
            frequency,
            day_of_week,
            day_of_month,
            month_of_year,
            start_date,
            end_date,
        );
        schedule.validate()?;

        let mut active: recurring_transactions::ActiveModel = definition.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(amount) = input.amount {
            LedgerService::validate_amount(amount)?;
            active.amount = Set(amount);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(auto_create) = input.auto_create {
            active.auto_create = Set(auto_create);
        }
        if schedule_changed {
            active.frequency = Set(frequency);
            active.day_of_week = Set(day_of_week);
            active.day_of_month = Set(day_of_month);
            active.month_of_year = Set(month_of_year);
            active.start_date = Set(start_date);
            active.end_date = Set(end_date);
            active.next_run_date = Set(initial_next_run(
                &schedule,
                chrono::Utc::now().date_naive(),
            ));
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Pauses a definition. `next_run_date` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition does not exist for this user.
    pub async fn pause(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<recurring_transactions::Model, RecurringError> {
        let definition = self
            .find_recurring(user_id, id)
            .await?
            .ok_or(RecurringError::NotFound(id))?;

        let mut active: recurring_transactions::ActiveModel = definition.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Resumes a paused definition, skipping missed occurrences.
    ///
    /// `next_run_date` advances to the first occurrence at or after today;
    /// nothing is backfilled.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition does not exist for this user.
    pub async fn resume(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<recurring_transactions::Model, RecurringError> {
        let definition = self
            .find_recurring(user_id, id)
            .await?
            .ok_or(RecurringError::NotFound(id))?;

        let schedule = schedule_from_model(&definition);
        let next_run = resume_catch_up(
            &schedule,
            definition.next_run_date,
            chrono::Utc::now().date_naive(),
        );

        let mut active: recurring_transactions::ActiveModel = definition.into();
        active.next_run_date = Set(next_run);
        active.is_active = Set(true);
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Lists a user's definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_recurring(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<recurring_transactions::Model>, RecurringError> {
        let definitions = recurring_transactions::Entity::find()
            .filter(recurring_transactions::Column::UserId.eq(user_id))
            .order_by_asc(recurring_transactions::Column::NextRunDate)
            .all(&self.db)
            .await?;
        Ok(definitions)
    }

    /// Finds one of the user's definitions by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_recurring(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<recurring_transactions::Model>, RecurringError> {
        let definition = recurring_transactions::Entity::find_by_id(id)
            .filter(recurring_transactions::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(definition)
    }

    /// Previews the next `limit` occurrences of a definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition does not exist for this user.
    pub async fn preview_occurrences(
        &self,
        user_id: Uuid,
        id: Uuid,
        limit: usize,
    ) -> Result<Vec<Occurrence>, RecurringError> {
        let definition = self
            .find_recurring(user_id, id)
            .await?
            .ok_or(RecurringError::NotFound(id))?;

        let schedule = schedule_from_model(&definition);
        let occurrences = preview(
            &schedule,
            definition.next_run_date,
            definition.amount,
            definition.kind.into(),
            limit,
        )
        .collect();
        Ok(occurrences)
    }

    /// Fires every due, auto-create definition once.
    ///
    /// Each definition is claimed with a conditional update keyed on the
    /// observed `next_run_date` before its posting is written; a claim that
    /// affects zero rows means another worker already fired it, and the
    /// definition is skipped. Safe to run concurrently from several workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the due query fails. Failures firing individual
    /// definitions (an inactive account, insufficient funds) are logged and
    /// skipped so one bad definition cannot stall the sweep.
    pub async fn process_due(&self, today: NaiveDate) -> Result<Vec<FiredOccurrence>, RecurringError> {
        let due = recurring_transactions::Entity::find()
            .filter(recurring_transactions::Column::IsActive.eq(true))
            .filter(recurring_transactions::Column::AutoCreate.eq(true))
            .filter(recurring_transactions::Column::NextRunDate.lte(today))
            // The end date bounds the last occurrence inclusively; anything
            // whose next run already passed it never fires again.
            .filter(
                Condition::any()
                    .add(recurring_transactions::Column::EndDate.is_null())
                    .add(
                        Expr::col(recurring_transactions::Column::NextRunDate)
                            .lte(Expr::col(recurring_transactions::Column::EndDate)),
                    ),
            )
            .order_by_asc(recurring_transactions::Column::NextRunDate)
            .all(&self.db)
            .await?;

        let mut fired = Vec::new();
        for definition in due {
            if !is_due(definition.is_active, definition.next_run_date, today) {
                continue;
            }
            match self.fire_one(&definition).await {
                Ok(Some(occurrence)) => fired.push(occurrence),
                Ok(None) => {} // claimed by another worker
                Err(error) => {
                    tracing::warn!(
                        recurring_id = %definition.id,
                        %error,
                        "skipping recurring transaction that failed to fire"
                    );
                }
            }
        }
        Ok(fired)
    }

    /// Fires a single definition: claim, post, advance, all in one
    /// transaction.
    async fn fire_one(
        &self,
        definition: &recurring_transactions::Model,
    ) -> Result<Option<FiredOccurrence>, RecurringError> {
        let schedule = schedule_from_model(definition);
        let run_date = definition.next_run_date;

        // A definition whose next run already passed its end date is done
        // for good; retire it instead of firing.
        if !within_end_date(run_date, schedule.end_date) {
            recurring_transactions::Entity::update_many()
                .col_expr(recurring_transactions::Column::IsActive, Expr::value(false))
                .filter(recurring_transactions::Column::Id.eq(definition.id))
                .filter(recurring_transactions::Column::IsActive.eq(true))
                .exec(&self.db)
                .await?;
            tracing::info!(recurring_id = %definition.id, "recurring transaction retired");
            return Ok(None);
        }

        let advanced = advance_one_period(run_date, &schedule);
        // This occurrence is the last one the end date admits; the claim
        // deactivates the definition along with advancing it.
        let exhausted = !within_end_date(advanced, schedule.end_date);

        let txn = self.db.begin().await?;

        // Conditional claim: only one concurrent worker observes the old
        // next_run_date, so only one fires.
        let claim = recurring_transactions::Entity::update_many()
            .col_expr(
                recurring_transactions::Column::LastRunDate,
                Expr::value(Some(run_date)),
            )
            .col_expr(
                recurring_transactions::Column::NextRunDate,
                Expr::value(advanced),
            )
            .col_expr(
                recurring_transactions::Column::IsActive,
                Expr::value(!exhausted),
            )
            .filter(recurring_transactions::Column::Id.eq(definition.id))
            .filter(recurring_transactions::Column::NextRunDate.eq(run_date))
            .filter(recurring_transactions::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;
        if claim.rows_affected == 0 {
            return Ok(None);
        }

        let account = load_locked(&txn, definition.user_id, definition.account_id)
            .await?
            .ok_or(RecurringError::AccountNotFound(definition.account_id))?;

        let draft = match definition.kind {
            PostingKind::Income => LedgerService::prepare_income(
                &snapshot(&account),
                definition.amount,
                definition.category_id,
                Some(definition.name.clone()),
                run_date,
            )?,
            PostingKind::Expense => LedgerService::prepare_expense(
                &snapshot(&account),
                definition.amount,
                definition.category_id,
                Some(definition.name.clone()),
                run_date,
            )?,
        };

        let posting = insert_posting(&txn, &draft, None, None, None).await?;
        adjust_balance(&txn, account, draft.balance_delta).await?;

        txn.commit().await?;
        tracing::info!(
            recurring_id = %definition.id,
            transaction_id = %posting.id,
            date = %run_date,
            "recurring transaction fired"
        );
        Ok(Some(FiredOccurrence {
            recurring_id: definition.id,
            transaction_id: posting.id,
            date: run_date,
        }))
    }

    /// Projects a user's active definitions to monthly-equivalent totals in
    /// the reporting currency. Conversion is best-effort: a missing rate
    /// leaves that definition's amount unconverted.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn monthly_projection(
        &self,
        user_id: Uuid,
        reporting_currency: &str,
    ) -> Result<MonthlyProjection, RecurringError> {
        let definitions = recurring_transactions::Entity::find()
            .filter(recurring_transactions::Column::UserId.eq(user_id))
            .filter(recurring_transactions::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        let category_ids: Vec<Uuid> = definitions.iter().filter_map(|d| d.category_id).collect();
        let passive_ids: Vec<Uuid> = if category_ids.is_empty() {
            Vec::new()
        } else {
            categories::Entity::find()
                .filter(categories::Column::Id.is_in(category_ids))
                .filter(categories::Column::IsPassive.eq(true))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect()
        };

        let mut currencies: Vec<String> =
            definitions.iter().map(|d| d.currency.clone()).collect();
        currencies.push(reporting_currency.to_string());
        currencies.sort();
        currencies.dedup();
        let quotes = load_quotes_touching(&self.db, &currencies).await?;

        let views: Vec<RecurringView> = definitions
            .iter()
            .map(|d| RecurringView {
                amount: d.amount,
                currency: d.currency.clone(),
                kind: d.kind.into(),
                frequency: d.frequency.into(),
                is_passive: d
                    .category_id
                    .is_some_and(|id| passive_ids.contains(&id)),
            })
            .collect();

        let projection = project_monthly(&views, reporting_currency, |amount, from| {
            resolve_rate(&quotes, from, reporting_currency, None)
                .ok()
                .map(|resolved| convert_amount(amount, resolved.rate, AMOUNT_SCALE))
        });
        Ok(projection)
    }
}

fn build_schedule(
    frequency: sea_orm_active_enums::Frequency,
    day_of_week: Option<i16>,
    day_of_month: Option<i16>,
    month_of_year: Option<i16>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Schedule {
    Schedule {
        frequency: frequency.into(),
        day_of_week: day_of_week.and_then(weekday_from_stored),
        day_of_month: day_of_month.and_then(|d| u32::try_from(d).ok()),
        month_of_year: month_of_year.and_then(|m| u32::try_from(m).ok()),
        start_date,
        end_date,
    }
}

fn schedule_from_model(model: &recurring_transactions::Model) -> Schedule {
    build_schedule(
        model.frequency,
        model.day_of_week,
        model.day_of_month,
        model.month_of_year,
        model.start_date,
        model.end_date,
    )
}

/// Maps the stored 0 = Monday convention to a `chrono::Weekday`.
fn weekday_from_stored(value: i16) -> Option<chrono::Weekday> {
    u8::try_from(value)
        .ok()
        .and_then(|v| chrono::Weekday::try_from(v).ok())
}

// ============================================================================
// Pure functions for property testing
// ============================================================================

/// Simulates the conditional claim each sweep worker issues.
///
/// The claim succeeds only when the stored `next_run_date` still equals the
/// value the worker observed when it decided the definition was due.
#[must_use]
pub fn claim_succeeds(stored_next_run: NaiveDate, observed_next_run: NaiveDate, is_active: bool) -> bool {
    is_active && stored_next_run == observed_next_run
}

/// Whether a run date is admitted by a schedule's end date. The end date
/// bounds the last occurrence inclusively; no end date admits every date.
#[must_use]
pub fn within_end_date(run_date: NaiveDate, end_date: Option<NaiveDate>) -> bool {
    end_date.is_none_or(|end| run_date <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use savora_core::schedule::Frequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_mapping() {
        assert_eq!(weekday_from_stored(0), Some(chrono::Weekday::Mon));
        assert_eq!(weekday_from_stored(6), Some(chrono::Weekday::Sun));
        assert_eq!(weekday_from_stored(7), None);
        assert_eq!(weekday_from_stored(-1), None);
    }

    #[test]
    fn test_end_date_bounds_last_firing() {
        let end = date(2025, 3, 31);

        // Inclusive: the end date itself still fires.
        assert!(within_end_date(date(2025, 3, 31), Some(end)));
        assert!(within_end_date(date(2025, 3, 1), Some(end)));
        // Past the end date nothing fires, however due the date looks.
        assert!(!within_end_date(date(2025, 4, 1), Some(end)));
        // No end date never expires.
        assert!(within_end_date(date(2099, 12, 31), None));
    }

    #[test]
    fn test_definition_exhausts_after_last_admitted_occurrence() {
        // Monthly on the 15th, ending April 20: April 15 is the last firing
        // and the advanced date falls outside the end date.
        let schedule = build_schedule(
            sea_orm_active_enums::Frequency::Monthly,
            None,
            Some(15),
            None,
            date(2025, 1, 15),
            Some(date(2025, 4, 20)),
        );

        let last_run = date(2025, 4, 15);
        assert!(within_end_date(last_run, schedule.end_date));

        let advanced = advance_one_period(last_run, &schedule);
        assert_eq!(advanced, date(2025, 5, 15));
        assert!(!within_end_date(advanced, schedule.end_date));
    }

    #[test]
    fn test_build_schedule_maps_selectors() {
        let schedule = build_schedule(
            sea_orm_active_enums::Frequency::Monthly,
            None,
            Some(31),
            None,
            date(2025, 1, 31),
            None,
        );
        assert_eq!(schedule.frequency, Frequency::Monthly);
        assert_eq!(schedule.day_of_month, Some(31));
        assert!(schedule.validate().is_ok());
    }

    proptest! {
        /// Two workers observing the same due definition: after the first
        /// claim advances next_run_date, the second claim must fail.
        #[test]
        fn prop_only_one_concurrent_claim_wins(
            day in 1u32..=28u32,
            month in 1u32..=12u32,
        ) {
            let next_run = date(2025, month, day);
            let schedule = build_schedule(
                sea_orm_active_enums::Frequency::Weekly,
                None,
                None,
                None,
                next_run,
                None,
            );

            // Both workers read the same row.
            let worker_a_observed = next_run;
            let worker_b_observed = next_run;

            // Worker A claims first; the stored value advances.
            prop_assert!(claim_succeeds(next_run, worker_a_observed, true));
            let stored_after_a = advance_one_period(next_run, &schedule);

            // Worker B's claim now sees a different stored value and loses.
            prop_assert!(!claim_succeeds(stored_after_a, worker_b_observed, true));
        }
    }
}
