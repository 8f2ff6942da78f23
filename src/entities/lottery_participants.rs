use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 参与记录实体
/// - (lottery_id, user_id) 唯一
/// - prize_id: 开奖后中奖者写入对应奖项，未中奖保持 NULL
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "lottery_participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lottery_id: i64,
    pub user_id: i64,
    pub prize_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lotteries::Entity",
        from = "Column::LotteryId",
        to = "super::lotteries::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Lottery,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
}

impl Related<super::lotteries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lottery.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
