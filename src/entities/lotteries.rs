use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 抽奖状态，只允许 PENDING -> DRAWING -> COMPLETED 单向流转
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotteryStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "DRAWING")]
    Drawing,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl std::fmt::Display for LotteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotteryStatus::Pending => write!(f, "PENDING"),
            LotteryStatus::Drawing => write!(f, "DRAWING"),
            LotteryStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// 抽奖实体
/// 说明:
/// - code: 8 位分享码，创建后不可变
/// - signature: 创建者对创建内容的钱包签名（留档）
/// - draw_at: 仅在进入 COMPLETED 时写入一次
/// - updated_at: 每次状态流转时刷新，开奖卡住巡检以此为准
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lotteries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub creator_id: i64,
    pub signature: String,
    pub status: LotteryStatus,
    pub draw_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否还接受报名
    pub fn is_open(&self) -> bool {
        self.status == LotteryStatus::Pending
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Creator,
    #[sea_orm(has_many = "super::lottery_prizes::Entity")]
    Prizes,
    #[sea_orm(has_many = "super::lottery_participants::Entity")]
    Participants,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::lottery_prizes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prizes.def()
    }
}

impl Related<super::lottery_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
