use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::entities::{LotteryStatus, lottery_entity, lottery_prize_entity as prize_entity};

use super::PaginatedResponse;

/// 奖项输入，字段顺序即签名原文中的顺序 (level, name, amount)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PrizeInput {
    /// 奖项等级，同一抽奖内唯一
    #[schema(example = 1)]
    pub level: i32,
    /// 奖项名称
    #[schema(example = "T-shirt")]
    pub name: String,
    /// 中奖名额 (>= 1)
    #[schema(example = 3)]
    pub amount: i32,
}

/// 创建抽奖请求
///
/// 字段全部可选，缺失由服务层统一返回 INVALID_REQUEST
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotteryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// 可选图片地址；缺失 (None)、null (Some(None)) 与空字符串在签名原文中各不相同
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub prizes: Option<Vec<PrizeInput>>,
    /// 创建者钱包地址
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    pub address: Option<String>,
    /// personal_sign 签名 (0x + 130 hex)
    pub signature: Option<String>,
}

/// 字段出现即为 Some，显式 null 得到 Some(None)
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// 报名 / 开奖请求
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[schema(example = "0x52908400098527886e0f7030069857d2e4169ee7")]
    pub address: Option<String>,
}

/// 抽奖列表查询参数
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LotteryListQuery {
    /// 按创建者地址过滤
    pub creator: Option<String>,
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeResponse {
    pub id: i64,
    pub level: i32,
    pub name: String,
    pub amount: i32,
}

impl From<prize_entity::Model> for PrizeResponse {
    fn from(m: prize_entity::Model) -> Self {
        PrizeResponse {
            id: m.id,
            level: m.level,
            name: m.name,
            amount: m.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatorInfo {
    pub wallet_address: String,
}

/// 抽奖详情
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotteryResponse {
    pub id: i64,
    #[schema(example = "K7M2Q9XA")]
    pub code: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub status: LotteryStatus,
    pub creator_id: i64,
    pub creator: CreatorInfo,
    /// 按 level 升序
    pub prizes: Vec<PrizeResponse>,
    pub participant_count: u64,
    pub draw_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    /// 仅创建接口返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
}

impl LotteryResponse {
    pub fn new(
        m: lottery_entity::Model,
        creator_address: String,
        prizes: Vec<prize_entity::Model>,
        participant_count: u64,
    ) -> Self {
        LotteryResponse {
            id: m.id,
            code: m.code,
            title: m.title,
            description: m.description,
            image_url: m.image_url,
            status: m.status,
            creator_id: m.creator_id,
            creator: CreatorInfo {
                wallet_address: creator_address,
            },
            prizes: prizes.into_iter().map(Into::into).collect(),
            participant_count,
            draw_at: m.draw_at,
            created_at: m.created_at,
            share_url: None,
        }
    }
}

/// 列表项（不含奖项明细）
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotterySummaryResponse {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub image_url: Option<String>,
    pub status: LotteryStatus,
    pub draw_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<lottery_entity::Model> for LotterySummaryResponse {
    fn from(m: lottery_entity::Model) -> Self {
        LotterySummaryResponse {
            id: m.id,
            code: m.code,
            title: m.title,
            image_url: m.image_url,
            status: m.status,
            draw_at: m.draw_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinLotteryResponse {
    #[schema(example = "Joined successfully")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawLotteryResponse {
    #[schema(example = "Draw completed")]
    pub message: String,
    /// 开奖时的有效参与人数
    pub participants: usize,
    /// 实际产生的中奖人数
    pub winners: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    pub prize_id: i64,
    pub level: i32,
    pub prize_name: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LotteryWinnersResponse {
    pub code: String,
    pub draw_at: Option<DateTime<Utc>>,
    /// 按奖项 level 升序
    pub winners: Vec<WinnerResponse>,
}

/// 抽奖列表分页响应
pub type LotteryPageResponse = PaginatedResponse<LotterySummaryResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_null_is_distinct_from_missing() {
        let missing: CreateLotteryRequest = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(missing.image_url, None);

        let null: CreateLotteryRequest = serde_json::from_str(r#"{"imageUrl":null}"#).unwrap();
        assert_eq!(null.image_url, Some(None));

        let empty: CreateLotteryRequest = serde_json::from_str(r#"{"imageUrl":""}"#).unwrap();
        assert_eq!(empty.image_url, Some(Some(String::new())));
    }
}
