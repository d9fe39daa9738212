//! Recurrence date arithmetic and the next-run state machine.
//!
//! Calendar rules:
//! - daily: +1 day
//! - weekly: +7 days
//! - monthly: same target day in the next month, clamped to month length
//!   (Jan 31 → Feb 28/29 → Mar 31)
//! - yearly: same anchor month/day next year, Feb 29 clamped on non-leap years

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;

use super::types::{Frequency, Occurrence, Schedule};
use crate::ledger::PostingKind;

/// Number of days in the given month.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

/// Builds a date with the day clamped to the month length.
fn clamped_date(year: i32, month: u32, target_day: u32) -> NaiveDate {
    let day = target_day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid")
}

/// Advances a date by one period of the schedule's frequency.
///
/// Monthly and yearly advancement re-anchor on the schedule's target day so
/// a clamped occurrence (Feb 28) returns to the anchor (Mar 31) afterwards.
#[must_use]
pub fn advance_one_period(date: NaiveDate, schedule: &Schedule) -> NaiveDate {
    match schedule.frequency {
        Frequency::Daily => date + Days::new(1),
        Frequency::Weekly => date + Days::new(7),
        Frequency::Monthly => {
            let (year, month) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            clamped_date(year, month, schedule.target_day())
        }
        Frequency::Yearly => clamped_date(
            date.year() + 1,
            schedule.target_month(),
            schedule.target_day(),
        ),
    }
}

/// Aligns the start date forward onto the schedule's selectors.
fn align_to_selectors(schedule: &Schedule) -> NaiveDate {
    let start = schedule.start_date;
    match schedule.frequency {
        Frequency::Daily => start,
        Frequency::Weekly => match schedule.day_of_week {
            Some(target) => {
                let offset = u64::from(
                    (target.num_days_from_monday() + 7 - start.weekday().num_days_from_monday())
                        % 7,
                );
                start + Days::new(offset)
            }
            None => start,
        },
        Frequency::Monthly => match schedule.day_of_month {
            Some(_) => {
                let candidate = clamped_date(start.year(), start.month(), schedule.target_day());
                if candidate < start {
                    advance_one_period(candidate, schedule)
                } else {
                    candidate
                }
            }
            None => start,
        },
        Frequency::Yearly => {
            if schedule.month_of_year.is_none() && schedule.day_of_month.is_none() {
                return start;
            }
            let candidate = clamped_date(
                start.year(),
                schedule.target_month(),
                schedule.target_day(),
            );
            if candidate < start {
                clamped_date(
                    start.year() + 1,
                    schedule.target_month(),
                    schedule.target_day(),
                )
            } else {
                candidate
            }
        }
    }
}

/// Seeds `next_run_date` for a new or edited definition.
///
/// A future start date is used as-is (aligned to selectors). Otherwise the
/// date is advanced period by period until it reaches today, so a definition
/// created on its own start date is immediately due.
#[must_use]
pub fn initial_next_run(schedule: &Schedule, today: NaiveDate) -> NaiveDate {
    let mut next = align_to_selectors(schedule);
    while next < today {
        next = advance_one_period(next, schedule);
    }
    next
}

/// Catch-up rule applied on resume: missed occurrences are skipped, not
/// backfilled, so the next run lands on the first occurrence ≥ today.
#[must_use]
pub fn resume_catch_up(schedule: &Schedule, next_run: NaiveDate, today: NaiveDate) -> NaiveDate {
    let mut next = next_run;
    while next < today {
        next = advance_one_period(next, schedule);
    }
    next
}

/// Whether an active definition is due to fire.
#[must_use]
pub fn is_due(is_active: bool, next_run: NaiveDate, today: NaiveDate) -> bool {
    is_active && next_run <= today
}

/// Lazy, bounded iterator over future occurrences.
#[derive(Debug)]
pub struct OccurrenceIter<'a> {
    schedule: &'a Schedule,
    next: NaiveDate,
    remaining: usize,
    amount: Decimal,
    kind: PostingKind,
}

impl Iterator for OccurrenceIter<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let date = self.next;
        if self.schedule.end_date.is_some_and(|end| date > end) {
            return None;
        }
        self.remaining -= 1;
        self.next = advance_one_period(date, self.schedule);
        Some(Occurrence {
            date,
            amount: self.amount,
            kind: self.kind,
        })
    }
}

/// Previews up to `limit` occurrences starting at `from`, stopping early if
/// the schedule's end date is exceeded.
#[must_use]
pub fn preview(
    schedule: &Schedule,
    from: NaiveDate,
    amount: Decimal,
    kind: PostingKind,
    limit: usize,
) -> OccurrenceIter<'_> {
    OccurrenceIter {
        schedule,
        next: from,
        remaining: limit,
        amount,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(frequency: Frequency, start: NaiveDate) -> Schedule {
        Schedule {
            frequency,
            day_of_week: None,
            day_of_month: None,
            month_of_year: None,
            start_date: start,
            end_date: None,
        }
    }

    #[rstest]
    #[case(2025, 1, 31)]
    #[case(2025, 2, 28)]
    #[case(2024, 2, 29)]
    #[case(2025, 4, 30)]
    #[case(2025, 12, 31)]
    fn test_days_in_month(#[case] year: i32, #[case] month: u32, #[case] expected: u32) {
        assert_eq!(days_in_month(year, month), expected);
    }

    #[test]
    fn test_month_end_clamping_chain() {
        // Anchored on day 31 starting Jan 31: Feb 28, Mar 31, Apr 30, May 31.
        let s = schedule(Frequency::Monthly, date(2025, 1, 31));

        let feb = advance_one_period(date(2025, 1, 31), &s);
        assert_eq!(feb, date(2025, 2, 28));

        let mar = advance_one_period(feb, &s);
        assert_eq!(mar, date(2025, 3, 31));

        let apr = advance_one_period(mar, &s);
        assert_eq!(apr, date(2025, 4, 30));

        let may = advance_one_period(apr, &s);
        assert_eq!(may, date(2025, 5, 31));
    }

    #[test]
    fn test_month_end_clamping_leap_year() {
        let s = schedule(Frequency::Monthly, date(2024, 1, 31));
        assert_eq!(advance_one_period(date(2024, 1, 31), &s), date(2024, 2, 29));
    }

    #[test]
    fn test_weekly_advance() {
        // Spec scenario: weekly starting Wed 2025-01-01 advances to 2025-01-08.
        let s = schedule(Frequency::Weekly, date(2025, 1, 1));
        assert_eq!(advance_one_period(date(2025, 1, 1), &s), date(2025, 1, 8));
    }

    #[test]
    fn test_daily_advance() {
        let s = schedule(Frequency::Daily, date(2025, 1, 1));
        assert_eq!(advance_one_period(date(2025, 1, 31), &s), date(2025, 2, 1));
    }

    #[test]
    fn test_yearly_advance_clamps_leap_day() {
        let s = schedule(Frequency::Yearly, date(2024, 2, 29));
        assert_eq!(advance_one_period(date(2024, 2, 29), &s), date(2025, 2, 28));
        // Back on Feb 29 when the leap year comes around.
        let s2028 = advance_one_period(
            advance_one_period(advance_one_period(date(2025, 2, 28), &s), &s),
            &s,
        );
        assert_eq!(s2028, date(2028, 2, 29));
    }

    #[test]
    fn test_initial_next_run_future_start() {
        let s = schedule(Frequency::Daily, date(2025, 6, 1));
        assert_eq!(initial_next_run(&s, date(2025, 1, 1)), date(2025, 6, 1));
    }

    #[test]
    fn test_initial_next_run_today_is_due() {
        // A definition created on its start date fires that same day.
        let s = schedule(Frequency::Weekly, date(2025, 1, 1));
        assert_eq!(initial_next_run(&s, date(2025, 1, 1)), date(2025, 1, 1));
    }

    #[test]
    fn test_initial_next_run_past_start_advances() {
        let s = schedule(Frequency::Weekly, date(2025, 1, 1));
        // Today is Jan 10: Jan 1 and Jan 8 are gone, next is Jan 15.
        assert_eq!(initial_next_run(&s, date(2025, 1, 10)), date(2025, 1, 15));
    }

    #[test]
    fn test_initial_next_run_weekday_alignment() {
        let mut s = schedule(Frequency::Weekly, date(2025, 1, 1)); // a Wednesday
        s.day_of_week = Some(Weekday::Fri);
        assert_eq!(initial_next_run(&s, date(2025, 1, 1)), date(2025, 1, 3));
    }

    #[test]
    fn test_initial_next_run_day_of_month_alignment() {
        let mut s = schedule(Frequency::Monthly, date(2025, 1, 20));
        s.day_of_month = Some(5);
        // The 5th is already past in January, so February 5 is next.
        assert_eq!(initial_next_run(&s, date(2025, 1, 20)), date(2025, 2, 5));
    }

    #[test]
    fn test_resume_skips_missed_occurrences() {
        let s = schedule(Frequency::Monthly, date(2025, 1, 31));
        // Paused since January; resuming in June skips Feb..May entirely.
        let next = resume_catch_up(&s, date(2025, 2, 28), date(2025, 6, 10));
        assert_eq!(next, date(2025, 6, 30));
    }

    #[test]
    fn test_resume_keeps_future_next_run() {
        let s = schedule(Frequency::Monthly, date(2025, 1, 31));
        let next = resume_catch_up(&s, date(2025, 7, 31), date(2025, 6, 10));
        assert_eq!(next, date(2025, 7, 31));
    }

    #[test]
    fn test_is_due() {
        assert!(is_due(true, date(2025, 1, 1), date(2025, 1, 1)));
        assert!(is_due(true, date(2024, 12, 1), date(2025, 1, 1)));
        assert!(!is_due(true, date(2025, 1, 2), date(2025, 1, 1)));
        assert!(!is_due(false, date(2024, 12, 1), date(2025, 1, 1)));
    }

    #[test]
    fn test_preview_bounded() {
        let s = schedule(Frequency::Monthly, date(2025, 1, 31));
        let dates: Vec<NaiveDate> = preview(&s, date(2025, 1, 31), dec!(100), PostingKind::Expense, 4)
            .map(|o| o.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30),
            ]
        );
    }

    #[test]
    fn test_preview_stops_at_end_date() {
        let mut s = schedule(Frequency::Weekly, date(2025, 1, 1));
        s.end_date = Some(date(2025, 1, 20));
        let occurrences: Vec<Occurrence> =
            preview(&s, date(2025, 1, 1), dec!(50000), PostingKind::Expense, 10).collect();
        assert_eq!(occurrences.len(), 3); // Jan 1, 8, 15; Jan 22 exceeds end
        assert_eq!(occurrences[2].date, date(2025, 1, 15));
        assert_eq!(occurrences[2].amount, dec!(50000));
    }

    #[test]
    fn test_preview_is_restartable() {
        let s = schedule(Frequency::Daily, date(2025, 1, 1));
        let first: Vec<_> =
            preview(&s, date(2025, 1, 1), dec!(1), PostingKind::Income, 3).collect();
        let second: Vec<_> =
            preview(&s, date(2025, 1, 1), dec!(1), PostingKind::Income, 3).collect();
        assert_eq!(first, second);
    }

    fn frequency_strategy() -> impl Strategy<Value = Frequency> {
        prop::sample::select(vec![
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Yearly,
        ])
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030i32, 1u32..=12u32, 1u32..=31u32).prop_map(|(y, m, d)| {
            clamped_date(y, m, d)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Advancing always moves strictly forward.
        #[test]
        fn prop_advance_strictly_increases(
            start in date_strategy(),
            frequency in frequency_strategy(),
        ) {
            let s = schedule(frequency, start);
            prop_assert!(advance_one_period(start, &s) > start);
        }

        /// The seeded next run is never in the past and is monotone in today.
        #[test]
        fn prop_initial_next_run_not_in_past(
            start in date_strategy(),
            today in date_strategy(),
            frequency in frequency_strategy(),
        ) {
            let s = schedule(frequency, start);
            let next = initial_next_run(&s, today);
            prop_assert!(next >= today || next >= start);
            prop_assert!(next >= today.min(start));
            if start <= today {
                prop_assert!(next >= today);
            }
        }

        /// Monthly advancement never loses the anchor day: the result's day
        /// is the anchor day or the last day of a shorter month.
        #[test]
        fn prop_monthly_clamping_preserves_anchor(
            start in date_strategy(),
        ) {
            let s = schedule(Frequency::Monthly, start);
            let anchor = s.target_day();
            let mut current = start;
            for _ in 0..24 {
                current = advance_one_period(current, &s);
                let month_len = days_in_month(current.year(), current.month());
                prop_assert_eq!(current.day(), anchor.min(month_len));
            }
        }

        /// Resume catch-up lands on the first occurrence >= today.
        #[test]
        fn prop_resume_lands_at_or_after_today(
            start in date_strategy(),
            today in date_strategy(),
            frequency in frequency_strategy(),
        ) {
            let s = schedule(frequency, start);
            let next = resume_catch_up(&s, start, today);
            prop_assert!(next >= today || next == start);
            if start < today {
                prop_assert!(next >= today);
                // One step back would be before today.
                prop_assert!(next == start || next <= advance_one_period(today, &s));
            }
        }
    }
}
