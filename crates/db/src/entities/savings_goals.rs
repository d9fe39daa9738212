//! `SeaORM` Entity for the savings_goals table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::GoalStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// Optional real account the goal's money lives in.
    pub account_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub target_amount: Decimal,
    /// Cached sum of contributions, floored at zero; recomputed inside
    /// every mutating operation.
    pub current_amount: Decimal,
    pub currency: String,
    pub target_date: Option<Date>,
    pub status: GoalStatus,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::savings_contributions::Entity")]
    SavingsContributions,
}

impl Related<super::savings_contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsContributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
