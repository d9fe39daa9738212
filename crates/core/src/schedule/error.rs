//! Schedule error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur when defining or advancing a schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Day-of-month selector must be 1..=31.
    #[error("Invalid day of month: {0}")]
    InvalidDayOfMonth(u32),

    /// Month-of-year selector must be 1..=12.
    #[error("Invalid month of year: {0}")]
    InvalidMonthOfYear(u32),

    /// End date must not precede the start date.
    #[error("End date {end} precedes start date {start}")]
    EndBeforeStart {
        /// Configured start date.
        start: NaiveDate,
        /// Configured end date.
        end: NaiveDate,
    },
}
