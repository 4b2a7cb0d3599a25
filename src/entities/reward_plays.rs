use crate::models::LedgerEntry;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 每日抽奖账本实体
/// 说明:
/// - user_id 唯一，一个用户一条，首次抽奖时创建
/// - last_played_at 同时作为条件更新的比较值
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_plays")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    pub last_played_at: DateTime<Utc>,
    pub last_prize_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for LedgerEntry {
    fn from(m: Model) -> Self {
        LedgerEntry {
            user_id: m.user_id,
            last_played_at: m.last_played_at,
            last_prize_name: m.last_prize_name,
        }
    }
}
