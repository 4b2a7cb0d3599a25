use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    CouponId,
}

/// 每日抽奖账本：每个用户一行，记录最近一次抽奖时间与结果
#[derive(DeriveIden)]
enum RewardPlays {
    Table,
    Id,
    UserId,
    LastPlayedAt,
    LastPrizeName,
    CreatedAt,
    UpdatedAt,
}

/// 中奖后发放的优惠券
#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    PrizeName,
    DiscountType,
    Value,
    AssignedTo,
    IsUsed,
    UsedAt,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 账本和优惠券均随用户删除级联删除。
/// reward_plays.user_id 唯一：首次抽奖的并发插入由唯一索引裁决。
/// coupons.code 唯一：生成冲突时由应用层重试。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RewardPlays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardPlays::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RewardPlays::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(RewardPlays::LastPlayedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardPlays::LastPrizeName)
                            .string_len(100)
                            .not_null()
                            .default("TRY AGAIN"),
                    )
                    .col(
                        ColumnDef::new(RewardPlays::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(RewardPlays::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_plays_user")
                            .from(RewardPlays::Table, RewardPlays::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_plays_user_unique")
                    .table(RewardPlays::Table)
                    .col(RewardPlays::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Coupons::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Coupons::PrizeName).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupons::Value).double().not_null())
                    .col(ColumnDef::new(Coupons::AssignedTo).big_integer().not_null())
                    .col(
                        ColumnDef::new(Coupons::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Coupons::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupons_user")
                            .from(Coupons::Table, Coupons::AssignedTo)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_code_unique")
                    .table(Coupons::Table)
                    .col(Coupons::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_assigned_to")
                    .table(Coupons::Table)
                    .col(Coupons::AssignedTo)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Orders::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_orders_coupon")
                            .from_tbl(Orders::Table)
                            .from_col(Orders::CouponId)
                            .to_tbl(Coupons::Table)
                            .to_col(Coupons::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Orders::Table)
                    .drop_foreign_key(Alias::new("fk_orders_coupon"))
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Coupons::Table).to_owned())
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RewardPlays::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
