//! Budget domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::BudgetError;

/// Period type of a budget allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Seven-day window.
    Weekly,
    /// Calendar-month window.
    Monthly,
    /// Twelve-month window.
    Yearly,
    /// Arbitrary fixed-length window.
    Custom,
}

/// Alert classification of a budget's consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Below 80% of the allocation.
    OnTrack,
    /// At or above 80% of the allocation.
    Warning,
    /// At or above the full allocation.
    OverBudget,
}

/// Inclusive date window a budget covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetWindow {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window (inclusive).
    pub end: NaiveDate,
}

impl BudgetWindow {
    /// Builds a window, rejecting an end before the start.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidWindow` when `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BudgetError> {
        if end < start {
            return Err(BudgetError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whether the date falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the window has fully elapsed as of `today`.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.end < today
    }
}

/// The slice of an expense posting that budget aggregation reads.
#[derive(Debug, Clone)]
pub struct ExpenseView {
    /// Posting amount (positive).
    pub amount: Decimal,
    /// Posting date.
    pub date: NaiveDate,
    /// Category of the posting, if any.
    pub category_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_dates() {
        assert!(matches!(
            BudgetWindow::new(date(2025, 2, 1), date(2025, 1, 1)),
            Err(BudgetError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = BudgetWindow::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert!(window.contains(date(2025, 1, 1)));
        assert!(window.contains(date(2025, 1, 31)));
        assert!(!window.contains(date(2025, 2, 1)));
    }

    #[test]
    fn test_window_expiry() {
        let window = BudgetWindow::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert!(!window.is_expired(date(2025, 1, 31)));
        assert!(window.is_expired(date(2025, 2, 1)));
    }
}
