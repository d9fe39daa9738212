//! `SeaORM` entity definitions.

pub mod accounts;
pub mod budgets;
pub mod categories;
pub mod exchange_rates;
pub mod recurring_transactions;
pub mod savings_contributions;
pub mod savings_goals;
pub mod sea_orm_active_enums;
pub mod transactions;
