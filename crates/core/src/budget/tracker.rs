//! Pure budget aggregation, classification, and renewal math.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::{BudgetPeriod, BudgetStatus, BudgetWindow, ExpenseView};

const WARNING_THRESHOLD: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const OVER_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Sums the expense postings that count against a budget.
///
/// A budget without a category matches every expense; otherwise only
/// postings carrying that exact category are counted. Postings outside the
/// window are ignored.
pub fn spent_amount<'a, I>(postings: I, category_id: Option<Uuid>, window: BudgetWindow) -> Decimal
where
    I: IntoIterator<Item = &'a ExpenseView>,
{
    postings
        .into_iter()
        .filter(|p| window.contains(p.date))
        .filter(|p| category_id.is_none_or(|c| p.category_id == Some(c)))
        .map(|p| p.amount)
        .sum()
}

/// Remaining allocation; negative when overspent.
#[must_use]
pub fn variance(allocated: Decimal, spent: Decimal) -> Decimal {
    allocated - spent
}

/// Spent amount as a percentage of the allocation, rounded to two places.
///
/// Returns `None` for a zero or negative allocation, where a percentage is
/// meaningless.
#[must_use]
pub fn spent_percent(allocated: Decimal, spent: Decimal) -> Option<Decimal> {
    if allocated <= Decimal::ZERO {
        return None;
    }
    Some((spent / allocated * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Classifies consumption: >=100% over budget, >=80% warning, else on track.
///
/// A zero allocation with any spending is over budget outright.
#[must_use]
pub fn status(allocated: Decimal, spent: Decimal) -> BudgetStatus {
    match spent_percent(allocated, spent) {
        Some(percent) if percent >= OVER_THRESHOLD => BudgetStatus::OverBudget,
        Some(percent) if percent >= WARNING_THRESHOLD => BudgetStatus::Warning,
        Some(_) => BudgetStatus::OnTrack,
        None if spent > Decimal::ZERO => BudgetStatus::OverBudget,
        None => BudgetStatus::OnTrack,
    }
}

/// Computes the window of the next equivalent period for renewal.
///
/// Calendar periods shift by calendar units (with chrono's own end-of-month
/// clamping); a custom period shifts by its exact length, starting the day
/// after the old window ends.
#[must_use]
pub fn next_window(period: BudgetPeriod, window: BudgetWindow) -> BudgetWindow {
    let (start, end) = match period {
        BudgetPeriod::Weekly => (window.start + Days::new(7), window.end + Days::new(7)),
        BudgetPeriod::Monthly => (
            window.start + Months::new(1),
            shift_month_end(window.start, window.end),
        ),
        BudgetPeriod::Yearly => (
            window.start + Months::new(12),
            window.end + Months::new(12),
        ),
        BudgetPeriod::Custom => {
            let length = window.end - window.start;
            let start = window.end + Days::new(1);
            (start, start + length)
        }
    };
    BudgetWindow { start, end }
}

/// Shifts a monthly window's end by one month, re-snapping to the last day
/// of the month when the old end was the last day of its month.
fn shift_month_end(start: NaiveDate, end: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let was_month_end = (end + Days::new(1)).month() != end.month();
    if was_month_end && start.day() == 1 {
        let first_of_next = end + Days::new(1);
        first_of_next + Months::new(1) - Days::new(1)
    } else {
        end + Months::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> BudgetWindow {
        BudgetWindow::new(start, end).unwrap()
    }

    fn expense(amount: Decimal, d: NaiveDate, category: Option<Uuid>) -> ExpenseView {
        ExpenseView {
            amount,
            date: d,
            category_id: category,
        }
    }

    #[test]
    fn test_spent_amount_filters_window_and_category() {
        let groceries = Uuid::now_v7();
        let transport = Uuid::now_v7();
        let postings = vec![
            expense(dec!(200000), date(2025, 1, 5), Some(groceries)),
            expense(dec!(150000), date(2025, 1, 20), Some(groceries)),
            expense(dec!(999999), date(2025, 2, 1), Some(groceries)), // outside
            expense(dec!(50000), date(2025, 1, 10), Some(transport)), // other category
            expense(dec!(30000), date(2025, 1, 12), None),
        ];
        let w = window(date(2025, 1, 1), date(2025, 1, 31));

        assert_eq!(spent_amount(&postings, Some(groceries), w), dec!(350000));
        // No category on the budget: everything in the window counts.
        assert_eq!(spent_amount(&postings, None, w), dec!(430000));
    }

    #[rstest]
    #[case(dec!(1000000), dec!(400000), Some(dec!(40.00)), BudgetStatus::OnTrack)]
    #[case(dec!(1000000), dec!(800000), Some(dec!(80.00)), BudgetStatus::Warning)]
    #[case(dec!(1000000), dec!(1000000), Some(dec!(100.00)), BudgetStatus::OverBudget)]
    #[case(dec!(1000000), dec!(1200000), Some(dec!(120.00)), BudgetStatus::OverBudget)]
    #[case(dec!(0), dec!(0), None, BudgetStatus::OnTrack)]
    #[case(dec!(0), dec!(1), None, BudgetStatus::OverBudget)]
    fn test_percent_and_status(
        #[case] allocated: Decimal,
        #[case] spent: Decimal,
        #[case] expected_percent: Option<Decimal>,
        #[case] expected_status: BudgetStatus,
    ) {
        assert_eq!(spent_percent(allocated, spent), expected_percent);
        assert_eq!(status(allocated, spent), expected_status);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(dec!(1000000), dec!(400000)), dec!(600000));
        assert_eq!(variance(dec!(1000000), dec!(1200000)), dec!(-200000));
    }

    #[test]
    fn test_next_window_weekly() {
        let next = next_window(
            BudgetPeriod::Weekly,
            window(date(2025, 1, 6), date(2025, 1, 12)),
        );
        assert_eq!(next, window(date(2025, 1, 13), date(2025, 1, 19)));
    }

    #[test]
    fn test_next_window_monthly_full_calendar_month() {
        // A January budget renews as a February budget ending Feb 28.
        let next = next_window(
            BudgetPeriod::Monthly,
            window(date(2025, 1, 1), date(2025, 1, 31)),
        );
        assert_eq!(next, window(date(2025, 2, 1), date(2025, 2, 28)));

        // And February renews back out to a full March.
        let next = next_window(BudgetPeriod::Monthly, next);
        assert_eq!(next, window(date(2025, 3, 1), date(2025, 3, 31)));
    }

    #[test]
    fn test_next_window_monthly_mid_month() {
        let next = next_window(
            BudgetPeriod::Monthly,
            window(date(2025, 1, 15), date(2025, 2, 14)),
        );
        assert_eq!(next, window(date(2025, 2, 15), date(2025, 3, 14)));
    }

    #[test]
    fn test_next_window_yearly() {
        let next = next_window(
            BudgetPeriod::Yearly,
            window(date(2025, 1, 1), date(2025, 12, 31)),
        );
        assert_eq!(next, window(date(2026, 1, 1), date(2026, 12, 31)));
    }

    #[test]
    fn test_next_window_custom_preserves_length() {
        let next = next_window(
            BudgetPeriod::Custom,
            window(date(2025, 1, 1), date(2025, 1, 10)),
        );
        assert_eq!(next, window(date(2025, 1, 11), date(2025, 1, 20)));
    }
}
