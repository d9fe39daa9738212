//! Savings goal lifecycle.
//!
//! A goal is a state machine over `active`, `paused`, `completed`, and
//! `cancelled`, driven by signed contributions. Completion is detected
//! automatically and reverts when withdrawals drop the balance below target.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{
    current_amount, evaluate_completion, validate_cancel, validate_contribution, validate_pause,
    validate_resume, validate_withdrawal, CompletionOutcome,
};
pub use error::SavingsError;
pub use types::{ContributionKind, ContributionView, GoalStatus};
