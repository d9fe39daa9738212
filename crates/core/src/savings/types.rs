//! Savings domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a savings goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    /// Accepting contributions, completion is being watched.
    Active,
    /// Temporarily suspended by the user.
    Paused,
    /// Target reached; reverts to active if the balance drops below target.
    Completed,
    /// Explicitly abandoned.
    Cancelled,
}

/// How a contribution came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    /// Entered directly against the goal.
    Manual,
    /// Wraps an existing ledger posting.
    Linked,
}

/// The slice of a contribution that aggregate recomputation reads.
#[derive(Debug, Clone)]
pub struct ContributionView {
    /// Signed amount: positive contributions, negative withdrawals.
    pub amount: Decimal,
    /// Date of the contribution.
    pub date: NaiveDate,
}
