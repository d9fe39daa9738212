//! Budget tracking.
//!
//! Spent amounts are cached aggregates over expense postings; this module
//! holds the pure aggregation, classification, and renewal-window math, with
//! persistence handled by the repository layer.

pub mod error;
pub mod tracker;
pub mod types;

pub use error::BudgetError;
pub use tracker::{next_window, spent_amount, spent_percent, status, variance};
pub use types::{BudgetPeriod, BudgetStatus, BudgetWindow, ExpenseView};
