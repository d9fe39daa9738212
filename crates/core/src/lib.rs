//! Core business logic for Savora.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations live
//! here; the `savora-db` crate wraps them in atomic persistence units.
//!
//! # Modules
//!
//! - `ledger` - Account balances, posting validation, transfer resolution
//! - `currency` - Exchange-rate resolution and conversion
//! - `schedule` - Recurring-transaction date arithmetic and projections
//! - `budget` - Budget spent/variance tracking
//! - `savings` - Savings-goal lifecycle and contributions
//! - `matching` - Category/account hint matching for parsed input

pub mod budget;
pub mod currency;
pub mod ledger;
pub mod matching;
pub mod savings;
pub mod schedule;
