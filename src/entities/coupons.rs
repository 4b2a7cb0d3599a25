use crate::models::{Coupon, DiscountType};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 优惠券实体
/// - code: 全局唯一，大写存储
/// - prize_name / discount_type / value: 发放时从奖品表复制的快照
/// - is_used: 只会从 false 变为 true
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub prize_name: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub assigned_to: i64,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AssignedTo",
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

impl From<Model> for Coupon {
    fn from(m: Model) -> Self {
        Coupon {
            id: m.id,
            code: m.code,
            prize_name: m.prize_name,
            discount_type: m.discount_type,
            value: m.value,
            assigned_to: m.assigned_to,
            is_used: m.is_used,
            used_at: m.used_at,
            expires_at: m.expires_at,
            created_at: m.created_at,
        }
    }
}
