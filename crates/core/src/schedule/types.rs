//! Schedule domain types.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ScheduleError;
use crate::ledger::PostingKind;

/// How often a recurring transaction fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Same day each month, clamped to month length.
    Monthly,
    /// Same month and day each year.
    Yearly,
}

/// The schedule-affecting fields of a recurring definition.
///
/// `next_run_date` lives on the stored definition, not here; this struct is
/// the input to the pure date arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Firing frequency.
    pub frequency: Frequency,
    /// Weekday selector for weekly schedules.
    pub day_of_week: Option<Weekday>,
    /// Day-of-month selector for monthly/yearly schedules.
    pub day_of_month: Option<u32>,
    /// Month selector for yearly schedules.
    pub month_of_year: Option<u32>,
    /// First date the definition may fire.
    pub start_date: NaiveDate,
    /// Optional last date (inclusive) the definition may fire.
    pub end_date: Option<NaiveDate>,
}

impl Schedule {
    /// Validates selector ranges and date ordering.
    ///
    /// # Errors
    ///
    /// Returns a `ScheduleError` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if let Some(dom) = self.day_of_month {
            if !(1..=31).contains(&dom) {
                return Err(ScheduleError::InvalidDayOfMonth(dom));
            }
        }
        if let Some(moy) = self.month_of_year {
            if !(1..=12).contains(&moy) {
                return Err(ScheduleError::InvalidMonthOfYear(moy));
            }
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ScheduleError::EndBeforeStart {
                    start: self.start_date,
                    end,
                });
            }
        }
        Ok(())
    }

    /// The day-of-month anchor for monthly/yearly advancement.
    ///
    /// Falls back to the start date's day so that a schedule anchored on
    /// Jan 31 keeps targeting the 31st even after clamping to February.
    #[must_use]
    pub fn target_day(&self) -> u32 {
        self.day_of_month.unwrap_or_else(|| self.start_date.day())
    }

    /// The month anchor for yearly advancement.
    #[must_use]
    pub fn target_month(&self) -> u32 {
        self.month_of_year
            .unwrap_or_else(|| self.start_date.month())
    }
}

/// A single projected occurrence of a recurring definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Date the occurrence would fire.
    pub date: NaiveDate,
    /// Amount of the generated posting.
    pub amount: Decimal,
    /// Direction of the generated posting.
    pub kind: PostingKind,
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_ok() {
        let mut s = schedule(Frequency::Monthly, date(2025, 1, 31));
        s.day_of_month = Some(31);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_selectors() {
        let mut s = schedule(Frequency::Monthly, date(2025, 1, 1));
        s.day_of_month = Some(32);
        assert!(matches!(
            s.validate(),
            Err(ScheduleError::InvalidDayOfMonth(32))
        ));

        let mut s = schedule(Frequency::Yearly, date(2025, 1, 1));
        s.month_of_year = Some(13);
        assert!(matches!(
            s.validate(),
            Err(ScheduleError::InvalidMonthOfYear(13))
        ));
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let mut s = schedule(Frequency::Daily, date(2025, 6, 1));
        s.end_date = Some(date(2025, 5, 1));
        assert!(matches!(
            s.validate(),
            Err(ScheduleError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn test_target_day_falls_back_to_start() {
        let s = schedule(Frequency::Monthly, date(2025, 1, 31));
        assert_eq!(s.target_day(), 31);

        let mut s = schedule(Frequency::Monthly, date(2025, 1, 5));
        s.day_of_month = Some(15);
        assert_eq!(s.target_day(), 15);
    }
}
