//! Pure savings goal state machine.
//!
//! The repository layer owns persistence and atomicity; everything here is a
//! pure function over the goal's status, target, and contribution history, so
//! the completion rules can be tested without a store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::SavingsError;
use super::types::{ContributionView, GoalStatus};

/// Recomputes a goal's saved amount from its contributions.
///
/// The sum is floored at zero: a history that nets negative (possible after
/// unlinking contributions) reads as an empty goal, not a debt.
pub fn current_amount<'a, I>(contributions: I) -> Decimal
where
    I: IntoIterator<Item = &'a ContributionView>,
{
    let total: Decimal = contributions.into_iter().map(|c| c.amount).sum();
    total.max(Decimal::ZERO)
}

/// Validates a contribution amount and that the goal still accepts money.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for amounts ≤ 0 and `InvalidTransition` for
/// cancelled goals.
pub fn validate_contribution(status: GoalStatus, amount: Decimal) -> Result<(), SavingsError> {
    if amount <= Decimal::ZERO {
        return Err(SavingsError::NonPositiveAmount(amount));
    }
    if status == GoalStatus::Cancelled {
        return Err(SavingsError::InvalidTransition {
            action: "contribute to",
            status,
        });
    }
    Ok(())
}

/// Validates a withdrawal against the goal's current amount.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for amounts ≤ 0 and `ExceedsBalance` when the
/// withdrawal is larger than what the goal holds.
pub fn validate_withdrawal(
    status: GoalStatus,
    available: Decimal,
    amount: Decimal,
) -> Result<(), SavingsError> {
    if amount <= Decimal::ZERO {
        return Err(SavingsError::NonPositiveAmount(amount));
    }
    if status == GoalStatus::Cancelled {
        return Err(SavingsError::InvalidTransition {
            action: "withdraw from",
            status,
        });
    }
    if amount > available {
        return Err(SavingsError::ExceedsBalance {
            available,
            requested: amount,
        });
    }
    Ok(())
}

/// Result of re-evaluating completion after an aggregate change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Status after evaluation.
    pub status: GoalStatus,
    /// Completion timestamp after evaluation.
    pub completed_at: Option<DateTime<Utc>>,
    /// True exactly when this evaluation transitioned the goal into
    /// `Completed`; the caller emits the goal-completed event on this flag.
    pub newly_completed: bool,
}

/// Re-evaluates a goal's completion status after `current_amount` changed.
///
/// Active and paused goals complete when the saved amount reaches the
/// target. A completed goal whose amount falls below target reverts to
/// active with its timestamp cleared, so a later re-completion stamps a
/// fresh timestamp and fires the event again. Cancelled goals never move.
#[must_use]
pub fn evaluate_completion(
    status: GoalStatus,
    completed_at: Option<DateTime<Utc>>,
    current: Decimal,
    target: Decimal,
    now: DateTime<Utc>,
) -> CompletionOutcome {
    match status {
        GoalStatus::Active | GoalStatus::Paused if current >= target => CompletionOutcome {
            status: GoalStatus::Completed,
            completed_at: Some(now),
            newly_completed: true,
        },
        GoalStatus::Completed if current < target => CompletionOutcome {
            status: GoalStatus::Active,
            completed_at: None,
            newly_completed: false,
        },
        _ => CompletionOutcome {
            status,
            completed_at,
            newly_completed: false,
        },
    }
}

/// Validates the `active → paused` transition.
///
/// # Errors
///
/// Returns `InvalidTransition` unless the goal is active.
pub fn validate_pause(status: GoalStatus) -> Result<(), SavingsError> {
    if status == GoalStatus::Active {
        Ok(())
    } else {
        Err(SavingsError::InvalidTransition {
            action: "pause",
            status,
        })
    }
}

/// Validates the `paused → active` transition. The caller re-evaluates
/// completion after resuming.
///
/// # Errors
///
/// Returns `InvalidTransition` unless the goal is paused.
pub fn validate_resume(status: GoalStatus) -> Result<(), SavingsError> {
    if status == GoalStatus::Paused {
        Ok(())
    } else {
        Err(SavingsError::InvalidTransition {
            action: "resume",
            status,
        })
    }
}

/// Validates cancellation, allowed from active or paused.
///
/// # Errors
///
/// Returns `InvalidTransition` for completed or already-cancelled goals.
pub fn validate_cancel(status: GoalStatus) -> Result<(), SavingsError> {
    match status {
        GoalStatus::Active | GoalStatus::Paused => Ok(()),
        _ => Err(SavingsError::InvalidTransition {
            action: "cancel",
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn contribution(amount: Decimal) -> ContributionView {
        ContributionView {
            amount,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_current_amount_sums_signed() {
        let history = vec![
            contribution(dec!(6000000)),
            contribution(dec!(4000000)),
            contribution(dec!(-1000000)),
        ];
        assert_eq!(current_amount(&history), dec!(9000000));
    }

    #[test]
    fn test_current_amount_floors_at_zero() {
        let history = vec![contribution(dec!(100)), contribution(dec!(-500))];
        assert_eq!(current_amount(&history), dec!(0));
    }

    #[test]
    fn test_completion_round_trip() {
        let target = dec!(10000000);
        let t0 = Utc::now();

        // 6M then 4M reaches the target and completes.
        let outcome =
            evaluate_completion(GoalStatus::Active, None, dec!(10000000), target, t0);
        assert_eq!(outcome.status, GoalStatus::Completed);
        assert_eq!(outcome.completed_at, Some(t0));
        assert!(outcome.newly_completed);

        // Withdrawing 1M drops below target: back to active, stamp cleared.
        let outcome = evaluate_completion(
            outcome.status,
            outcome.completed_at,
            dec!(9000000),
            target,
            t0,
        );
        assert_eq!(outcome.status, GoalStatus::Active);
        assert_eq!(outcome.completed_at, None);
        assert!(!outcome.newly_completed);

        // Re-contributing completes again with a fresh timestamp and event.
        let t1 = Utc::now();
        let outcome = evaluate_completion(
            outcome.status,
            outcome.completed_at,
            dec!(10000000),
            target,
            t1,
        );
        assert_eq!(outcome.status, GoalStatus::Completed);
        assert_eq!(outcome.completed_at, Some(t1));
        assert!(outcome.newly_completed);
    }

    #[test]
    fn test_completion_does_not_refire_when_already_completed() {
        let t0 = Utc::now();
        let outcome = evaluate_completion(
            GoalStatus::Completed,
            Some(t0),
            dec!(12000000),
            dec!(10000000),
            Utc::now(),
        );
        assert_eq!(outcome.status, GoalStatus::Completed);
        assert_eq!(outcome.completed_at, Some(t0));
        assert!(!outcome.newly_completed);
    }

    #[test]
    fn test_paused_goal_can_complete() {
        let outcome = evaluate_completion(
            GoalStatus::Paused,
            None,
            dec!(10000000),
            dec!(10000000),
            Utc::now(),
        );
        assert_eq!(outcome.status, GoalStatus::Completed);
        assert!(outcome.newly_completed);
    }

    #[test]
    fn test_cancelled_goal_never_moves() {
        let outcome = evaluate_completion(
            GoalStatus::Cancelled,
            None,
            dec!(99999999),
            dec!(1),
            Utc::now(),
        );
        assert_eq!(outcome.status, GoalStatus::Cancelled);
        assert!(!outcome.newly_completed);
    }

    #[test]
    fn test_withdrawal_validation() {
        assert!(validate_withdrawal(GoalStatus::Active, dec!(1000), dec!(500)).is_ok());
        assert!(matches!(
            validate_withdrawal(GoalStatus::Active, dec!(1000), dec!(1500)),
            Err(SavingsError::ExceedsBalance { .. })
        ));
        assert!(matches!(
            validate_withdrawal(GoalStatus::Active, dec!(1000), dec!(0)),
            Err(SavingsError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_contribution_validation() {
        assert!(validate_contribution(GoalStatus::Active, dec!(100)).is_ok());
        assert!(validate_contribution(GoalStatus::Paused, dec!(100)).is_ok());
        assert!(matches!(
            validate_contribution(GoalStatus::Cancelled, dec!(100)),
            Err(SavingsError::InvalidTransition { .. })
        ));
        assert!(matches!(
            validate_contribution(GoalStatus::Active, dec!(-1)),
            Err(SavingsError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(validate_pause(GoalStatus::Active).is_ok());
        assert!(validate_pause(GoalStatus::Paused).is_err());
        assert!(validate_resume(GoalStatus::Paused).is_ok());
        assert!(validate_resume(GoalStatus::Active).is_err());
        assert!(validate_cancel(GoalStatus::Active).is_ok());
        assert!(validate_cancel(GoalStatus::Paused).is_ok());
        assert!(validate_cancel(GoalStatus::Completed).is_err());
        assert!(validate_cancel(GoalStatus::Cancelled).is_err());
    }

    proptest! {
        /// The saved amount is never negative regardless of history.
        #[test]
        fn prop_current_amount_non_negative(
            amounts in prop::collection::vec(-1_000_000i64..1_000_000i64, 0..50),
        ) {
            let history: Vec<ContributionView> = amounts
                .into_iter()
                .map(|a| contribution(Decimal::from(a)))
                .collect();
            prop_assert!(current_amount(&history) >= Decimal::ZERO);
        }

        /// Evaluation is idempotent: running it twice on its own output
        /// changes nothing and never fires a second event.
        #[test]
        fn prop_evaluation_idempotent(
            current in 0i64..20_000_000i64,
            target in 1i64..20_000_000i64,
        ) {
            let now = Utc::now();
            let first = evaluate_completion(
                GoalStatus::Active,
                None,
                Decimal::from(current),
                Decimal::from(target),
                now,
            );
            let second = evaluate_completion(
                first.status,
                first.completed_at,
                Decimal::from(current),
                Decimal::from(target),
                now,
            );
            prop_assert_eq!(first.status, second.status);
            prop_assert_eq!(first.completed_at, second.completed_at);
            prop_assert!(!second.newly_completed);
        }
    }
}
