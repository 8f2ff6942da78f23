use sea_orm_migration::prelude::*;

use crate::m20250101_000001_create_users::Users;

/// Lotteries (抽奖活动)
#[derive(DeriveIden)]
enum Lotteries {
    Table,
    Id,
    Code,
    Title,
    Description,
    ImageUrl,
    CreatorId,
    Signature,
    Status,
    DrawAt,
    CreatedAt,
    UpdatedAt,
}

/// Lottery Prizes (奖项配置，创建后不可修改)
#[derive(DeriveIden)]
enum LotteryPrizes {
    Table,
    Id,
    LotteryId,
    Level,
    Name,
    Amount,
    CreatedAt,
}

/// Lottery Participants (参与记录，prize_id 在开奖后写入)
#[derive(DeriveIden)]
enum LotteryParticipants {
    Table,
    Id,
    LotteryId,
    UserId,
    PrizeId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// status 使用字符串列而非 Postgres 原生枚举，SQLite 测试库同样适用:
/// PENDING -> DRAWING -> COMPLETED
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lotteries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lotteries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lotteries::Code).string_len(8).not_null())
                    .col(ColumnDef::new(Lotteries::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Lotteries::Description).text().not_null())
                    .col(ColumnDef::new(Lotteries::ImageUrl).text().null())
                    .col(ColumnDef::new(Lotteries::CreatorId).big_integer().not_null())
                    .col(ColumnDef::new(Lotteries::Signature).text().not_null())
                    .col(
                        ColumnDef::new(Lotteries::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Lotteries::DrawAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Lotteries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Lotteries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lotteries_creator")
                            .from(Lotteries::Table, Lotteries::CreatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lotteries_code_unique")
                    .table(Lotteries::Table)
                    .col(Lotteries::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建者历史列表
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lotteries_creator")
                    .table(Lotteries::Table)
                    .col(Lotteries::CreatorId)
                    .to_owned(),
            )
            .await?;

        // 开奖卡住巡检按状态扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lotteries_status")
                    .table(Lotteries::Table)
                    .col(Lotteries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LotteryPrizes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotteryPrizes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LotteryPrizes::LotteryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotteryPrizes::Level).integer().not_null())
                    .col(ColumnDef::new(LotteryPrizes::Name).string_len(255).not_null())
                    .col(ColumnDef::new(LotteryPrizes::Amount).integer().not_null())
                    .col(
                        ColumnDef::new(LotteryPrizes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lottery_prizes_lottery")
                            .from(LotteryPrizes::Table, LotteryPrizes::LotteryId)
                            .to(Lotteries::Table, Lotteries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一抽奖内 level 唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_prizes_lottery_level_unique")
                    .table(LotteryPrizes::Table)
                    .col(LotteryPrizes::LotteryId)
                    .col(LotteryPrizes::Level)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LotteryParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotteryParticipants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LotteryParticipants::LotteryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryParticipants::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotteryParticipants::PrizeId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LotteryParticipants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lottery_participants_lottery")
                            .from(LotteryParticipants::Table, LotteryParticipants::LotteryId)
                            .to(Lotteries::Table, Lotteries::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lottery_participants_user")
                            .from(LotteryParticipants::Table, LotteryParticipants::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lottery_participants_prize")
                            .from(LotteryParticipants::Table, LotteryParticipants::PrizeId)
                            .to(LotteryPrizes::Table, LotteryPrizes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个用户每个抽奖仅一条参与记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lottery_participants_lottery_user_unique")
                    .table(LotteryParticipants::Table)
                    .col(LotteryParticipants::LotteryId)
                    .col(LotteryParticipants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：参与记录 -> 奖项 -> 抽奖
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LotteryParticipants::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LotteryPrizes::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Lotteries::Table).to_owned())
            .await?;

        Ok(())
    }
}
