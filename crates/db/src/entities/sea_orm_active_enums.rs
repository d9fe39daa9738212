//! Database enum mappings.
//!
//! Each enum mirrors a Postgres enum created by the initial migration and
//! converts to/from its pure counterpart in `savora-core`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use savora_core::budget::BudgetPeriod as CorePeriod;
use savora_core::ledger::{AccountKind as CoreAccountKind, PostingKind as CorePostingKind};
use savora_core::savings::{ContributionKind as CoreContributionKind, GoalStatus as CoreStatus};
use savora_core::schedule::Frequency as CoreFrequency;

/// Account kind enum (`account_kind`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
pub enum AccountKind {
    #[sea_orm(string_value = "bank")]
    Bank,
    #[sea_orm(string_value = "credit_card")]
    CreditCard,
    #[sea_orm(string_value = "investment")]
    Investment,
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "loan")]
    Loan,
    #[sea_orm(string_value = "e_wallet")]
    EWallet,
    #[sea_orm(string_value = "other")]
    Other,
}

impl From<AccountKind> for CoreAccountKind {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Bank => Self::Bank,
            AccountKind::CreditCard => Self::CreditCard,
            AccountKind::Investment => Self::Investment,
            AccountKind::Cash => Self::Cash,
            AccountKind::Loan => Self::Loan,
            AccountKind::EWallet => Self::EWallet,
            AccountKind::Other => Self::Other,
        }
    }
}

impl From<CoreAccountKind> for AccountKind {
    fn from(kind: CoreAccountKind) -> Self {
        match kind {
            CoreAccountKind::Bank => Self::Bank,
            CoreAccountKind::CreditCard => Self::CreditCard,
            CoreAccountKind::Investment => Self::Investment,
            CoreAccountKind::Cash => Self::Cash,
            CoreAccountKind::Loan => Self::Loan,
            CoreAccountKind::EWallet => Self::EWallet,
            CoreAccountKind::Other => Self::Other,
        }
    }
}

/// Posting direction enum (`posting_kind`). Transfers are stored as a
/// linked expense/income pair, so there is no separate transfer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "posting_kind")]
pub enum PostingKind {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<PostingKind> for CorePostingKind {
    fn from(kind: PostingKind) -> Self {
        match kind {
            PostingKind::Income => Self::Income,
            PostingKind::Expense => Self::Expense,
        }
    }
}

impl From<CorePostingKind> for PostingKind {
    fn from(kind: CorePostingKind) -> Self {
        match kind {
            CorePostingKind::Income => Self::Income,
            CorePostingKind::Expense => Self::Expense,
        }
    }
}

/// Recurrence frequency enum (`recurrence_frequency`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "recurrence_frequency"
)]
pub enum Frequency {
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

impl From<Frequency> for CoreFrequency {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Daily => Self::Daily,
            Frequency::Weekly => Self::Weekly,
            Frequency::Monthly => Self::Monthly,
            Frequency::Yearly => Self::Yearly,
        }
    }
}

impl From<CoreFrequency> for Frequency {
    fn from(frequency: CoreFrequency) -> Self {
        match frequency {
            CoreFrequency::Daily => Self::Daily,
            CoreFrequency::Weekly => Self::Weekly,
            CoreFrequency::Monthly => Self::Monthly,
            CoreFrequency::Yearly => Self::Yearly,
        }
    }
}

/// Budget period enum (`budget_period`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "budget_period")]
pub enum BudgetPeriod {
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl From<BudgetPeriod> for CorePeriod {
    fn from(period: BudgetPeriod) -> Self {
        match period {
            BudgetPeriod::Weekly => Self::Weekly,
            BudgetPeriod::Monthly => Self::Monthly,
            BudgetPeriod::Yearly => Self::Yearly,
            BudgetPeriod::Custom => Self::Custom,
        }
    }
}

impl From<CorePeriod> for BudgetPeriod {
    fn from(period: CorePeriod) -> Self {
        match period {
            CorePeriod::Weekly => Self::Weekly,
            CorePeriod::Monthly => Self::Monthly,
            CorePeriod::Yearly => Self::Yearly,
            CorePeriod::Custom => Self::Custom,
        }
    }
}

/// Savings goal status enum (`goal_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "goal_status")]
pub enum GoalStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<GoalStatus> for CoreStatus {
    fn from(status: GoalStatus) -> Self {
        match status {
            GoalStatus::Active => Self::Active,
            GoalStatus::Paused => Self::Paused,
            GoalStatus::Completed => Self::Completed,
            GoalStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<CoreStatus> for GoalStatus {
    fn from(status: CoreStatus) -> Self {
        match status {
            CoreStatus::Active => Self::Active,
            CoreStatus::Paused => Self::Paused,
            CoreStatus::Completed => Self::Completed,
            CoreStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Contribution kind enum (`contribution_kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "contribution_kind")]
pub enum ContributionKind {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "linked")]
    Linked,
}

impl From<ContributionKind> for CoreContributionKind {
    fn from(kind: ContributionKind) -> Self {
        match kind {
            ContributionKind::Manual => Self::Manual,
            ContributionKind::Linked => Self::Linked,
        }
    }
}

impl From<CoreContributionKind> for ContributionKind {
    fn from(kind: CoreContributionKind) -> Self {
        match kind {
            CoreContributionKind::Manual => Self::Manual,
            CoreContributionKind::Linked => Self::Linked,
        }
    }
}
