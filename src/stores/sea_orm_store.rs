use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use super::{RewardStore, StoreError};
use crate::entities::{coupon_entity as coupons, reward_play_entity as plays};
use crate::models::{Coupon, LedgerEntry, LedgerWrite, NewCoupon, PlayRecord};

/// PostgreSQL 实现（sea-orm）
///
/// 并发约束依赖数据库：
/// - 账本写入与优惠券插入在同一事务内，任一失败整体回滚
/// - reward_plays.user_id 唯一索引裁决首次抽奖的并发插入
/// - 之后的抽奖使用 `WHERE last_played_at = 旧值` 条件更新
/// - coupons.code 唯一索引保证优惠码不重复
/// - 核销使用 `WHERE is_used = false` 条件更新
#[derive(Clone)]
pub struct SeaOrmRewardStore {
    pool: DatabaseConnection,
}

impl SeaOrmRewardStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// 账本条件写入；返回 false 表示读取之后已被其它请求写过
async fn write_ledger(txn: &DatabaseTransaction, record: &PlayRecord) -> Result<bool, DbErr> {
    match record.previous {
        None => {
            let inserted = plays::ActiveModel {
                user_id: Set(record.user_id),
                last_played_at: Set(record.played_at),
                last_prize_name: Set(record.prize_name.clone()),
                created_at: Set(record.played_at),
                updated_at: Set(record.played_at),
                ..Default::default()
            }
            .insert(txn)
            .await;

            match inserted {
                Ok(_) => Ok(true),
                // 并发首次抽奖：另一请求已插入
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        }
        Some(previous) => {
            let result = plays::Entity::update_many()
                .col_expr(plays::Column::LastPlayedAt, Expr::value(record.played_at))
                .col_expr(
                    plays::Column::LastPrizeName,
                    Expr::value(record.prize_name.clone()),
                )
                .col_expr(plays::Column::UpdatedAt, Expr::value(record.played_at))
                .filter(plays::Column::UserId.eq(record.user_id))
                .filter(plays::Column::LastPlayedAt.eq(previous))
                .exec(txn)
                .await?;
            Ok(result.rows_affected == 1)
        }
    }
}

async fn insert_coupon(txn: &DatabaseTransaction, coupon: NewCoupon) -> Result<Coupon, StoreError> {
    let code = coupon.code.clone();
    let inserted = coupons::ActiveModel {
        code: Set(coupon.code),
        prize_name: Set(coupon.prize_name),
        discount_type: Set(coupon.discount_type),
        value: Set(coupon.value),
        assigned_to: Set(coupon.assigned_to),
        is_used: Set(false),
        used_at: Set(None),
        expires_at: Set(coupon.expires_at),
        created_at: Set(coupon.created_at),
        ..Default::default()
    }
    .insert(txn)
    .await;

    match inserted {
        Ok(model) => Ok(model.into()),
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateCode(code)),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RewardStore for SeaOrmRewardStore {
    async fn find_ledger(&self, user_id: i64) -> Result<Option<LedgerEntry>, StoreError> {
        let row = plays::Entity::find()
            .filter(plays::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn record_play(&self, record: PlayRecord) -> Result<LedgerWrite, StoreError> {
        let txn = self.pool.begin().await?;

        if !write_ledger(&txn, &record).await? {
            txn.rollback().await?;
            return Ok(LedgerWrite::Stale);
        }

        let coupon = match record.coupon {
            Some(coupon) => match insert_coupon(&txn, coupon).await {
                Ok(coupon) => Some(coupon),
                Err(e) => {
                    // 账本写入一并回滚
                    txn.rollback().await?;
                    return Err(e);
                }
            },
            None => None,
        };

        txn.commit().await?;
        Ok(LedgerWrite::Applied(coupon))
    }

    async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let row = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code))
            .one(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_coupon(&self, coupon_id: i64) -> Result<Option<Coupon>, StoreError> {
        let row = coupons::Entity::find_by_id(coupon_id)
            .one(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn mark_coupon_used(
        &self,
        coupon_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = coupons::Entity::update_many()
            .col_expr(coupons::Column::IsUsed, Expr::value(true))
            .col_expr(coupons::Column::UsedAt, Expr::value(Some(used_at)))
            .filter(coupons::Column::Id.eq(coupon_id))
            .filter(coupons::Column::IsUsed.eq(false))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn list_user_coupons(&self, user_id: i64) -> Result<Vec<Coupon>, StoreError> {
        let rows = coupons::Entity::find()
            .filter(coupons::Column::AssignedTo.eq(user_id))
            .order_by_desc(coupons::Column::CreatedAt)
            .order_by_desc(coupons::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
