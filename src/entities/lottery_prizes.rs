use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 奖项实体
/// - level: 同一抽奖内唯一，开奖按 level 升序依次抽取
/// - amount: 该奖项的中奖名额 (>= 1)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_prizes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lottery_id: i64,
    pub level: i32,
    pub name: String,
    pub amount: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lotteries::Entity",
        from = "Column::LotteryId",
        to = "super::lotteries::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Lottery,
}

impl Related<super::lotteries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lottery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
