//! Monthly-equivalent projection across recurring definitions.
//!
//! Each frequency is normalized to a per-month figure so income and expense
//! definitions with mixed frequencies can be summed into one projection.

use rust_decimal::Decimal;

use super::types::Frequency;
use crate::ledger::PostingKind;

/// Average days per month over the Gregorian 400-year cycle (30.4375).
const DAYS_PER_MONTH: Decimal = Decimal::from_parts(304_375, 0, 0, false, 4);

/// Average weeks per month (4.348).
const WEEKS_PER_MONTH: Decimal = Decimal::from_parts(4348, 0, 0, false, 3);

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Normalizes an amount at the given frequency to its per-month equivalent.
#[must_use]
pub fn monthly_equivalent(amount: Decimal, frequency: Frequency) -> Decimal {
    match frequency {
        Frequency::Daily => amount * DAYS_PER_MONTH,
        Frequency::Weekly => amount * WEEKS_PER_MONTH,
        Frequency::Monthly => amount,
        Frequency::Yearly => amount / MONTHS_PER_YEAR,
    }
}

/// The projection-relevant slice of a recurring definition.
#[derive(Debug, Clone)]
pub struct RecurringView {
    /// Amount per occurrence, in the definition's own currency.
    pub amount: Decimal,
    /// Currency the amount is denominated in.
    pub currency: String,
    /// Direction of the generated postings.
    pub kind: PostingKind,
    /// Firing frequency.
    pub frequency: Frequency,
    /// Whether the definition's category counts as passive income.
    pub is_passive: bool,
}

/// Aggregated monthly projection in the reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyProjection {
    /// Projected monthly income.
    pub income: Decimal,
    /// Projected monthly expense.
    pub expense: Decimal,
    /// Projected monthly income from passive categories.
    pub passive_income: Decimal,
    /// Passive income as a percentage of expenses; `None` when there are no
    /// projected expenses to cover.
    pub passive_coverage: Option<Decimal>,
}

/// Projects the monthly income/expense totals for a set of definitions.
///
/// `convert` maps an amount from a definition's currency into the reporting
/// currency; conversion is best-effort, so a definition whose rate is
/// unavailable contributes its unconverted amount rather than failing the
/// whole projection.
pub fn project_monthly<F>(
    definitions: &[RecurringView],
    reporting_currency: &str,
    convert: F,
) -> MonthlyProjection
where
    F: Fn(Decimal, &str) -> Option<Decimal>,
{
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    let mut passive_income = Decimal::ZERO;

    for def in definitions {
        let monthly = monthly_equivalent(def.amount, def.frequency);
        let converted = if def.currency == reporting_currency {
            monthly
        } else {
            convert(monthly, &def.currency).unwrap_or(monthly)
        };
        match def.kind {
            PostingKind::Income => {
                income += converted;
                if def.is_passive {
                    passive_income += converted;
                }
            }
            PostingKind::Expense => expense += converted,
        }
    }

    let passive_coverage = if expense > Decimal::ZERO {
        Some((passive_income / expense * Decimal::ONE_HUNDRED).round_dp(2))
    } else {
        None
    };

    MonthlyProjection {
        income,
        expense,
        passive_income,
        passive_coverage,
    }
}
