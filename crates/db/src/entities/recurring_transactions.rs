//! `SeaORM` Entity for the recurring_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{Frequency, PostingKind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub kind: PostingKind,
    pub amount: Decimal,
    pub currency: String,
    pub frequency: Frequency,
    /// 0 = Monday .. 6 = Sunday, for weekly schedules.
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub month_of_year: Option<i16>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    /// Earliest not-yet-fired occurrence; advanced atomically with each
    /// generated posting.
    pub next_run_date: Date,
    pub last_run_date: Option<Date>,
    pub is_active: bool,
    pub auto_create: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
