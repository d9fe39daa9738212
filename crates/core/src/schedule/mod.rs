//! Recurring-transaction scheduling.
//!
//! This module implements the date-scheduling state machine:
//! - Per-frequency advancement with end-of-month clamping
//! - Next-run seeding, post-fire advancement, and resume catch-up
//! - Bounded occurrence previews
//! - Monthly-equivalent projections across frequencies

pub mod error;
pub mod projection;
pub mod recurrence;
pub mod types;

pub use error::ScheduleError;
pub use projection::{monthly_equivalent, project_monthly, MonthlyProjection, RecurringView};
pub use recurrence::{
    advance_one_period, initial_next_run, is_due, preview, resume_catch_up, OccurrenceIter,
};
pub use types::{Frequency, Occurrence, Schedule};
