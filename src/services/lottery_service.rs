use crate::config::LotteryConfig;
use crate::entities::{
    LotteryStatus, lottery_entity as lotteries, lottery_participant_entity as participants,
    lottery_prize_entity as prizes, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::external::ParticipationSet;
use crate::models::{
    AddressRequest, CreateLotteryRequest, DrawLotteryResponse, JoinLotteryResponse,
    LotteryListQuery, LotteryPageResponse, LotteryResponse, LotterySummaryResponse,
    LotteryWinnersResponse, PaginatedResponse, PaginationParams, PrizeInput, WinnerResponse,
};
use crate::services::UserService;
use crate::utils::{
    creation_message, generate_unique_lottery_code, is_valid_lottery_code, normalize_wallet_address,
    require_wallet_address, same_address, select_winners, validate_wallet_address,
    verify_signature,
};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 单个抽奖最多允许的奖项数
pub const MAX_PRIZES: usize = 5;

/// 标题与奖项名称的最大字符数（varchar(255)）
pub const MAX_NAME_LEN: usize = 255;

/// 校验通过的创建参数
struct NewLottery {
    title: String,
    description: String,
    image_url: Option<String>,
    prizes: Vec<PrizeInput>,
    address: String,
    signature: String,
}

#[derive(Clone)]
pub struct LotteryService {
    pool: DatabaseConnection,
    participants: Arc<dyn ParticipationSet>,
    user_service: UserService,
    config: LotteryConfig,
}

impl LotteryService {
    pub fn new(
        pool: DatabaseConnection,
        participants: Arc<dyn ParticipationSet>,
        config: LotteryConfig,
    ) -> Self {
        Self {
            user_service: UserService::new(pool.clone()),
            pool,
            participants,
            config,
        }
    }

    /// 创建抽奖
    ///
    /// 1. 校验必填字段与奖项配置
    /// 2. 校验钱包签名（签名原文按请求原样重建）
    /// 3. upsert 创建者、生成唯一抽奖码
    /// 4. 抽奖与奖项在同一事务内写入，状态 PENDING
    pub async fn create(&self, req: CreateLotteryRequest) -> AppResult<LotteryResponse> {
        let new = validate_create_request(&req)?;

        let message = creation_message(&req)?;
        if !verify_signature(&message, &new.signature, &new.address) {
            return Err(AppError::AuthError("Invalid signature".to_string()));
        }

        let creator_address = normalize_wallet_address(&new.address);
        let creator = self.user_service.ensure_user(&creator_address).await?;

        let code = generate_unique_lottery_code(&self.pool, self.config.code_max_attempts).await?;

        let mut prize_inputs = new.prizes;
        prize_inputs.sort_by_key(|p| p.level);

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        let lottery = lotteries::ActiveModel {
            code: Set(code.clone()),
            title: Set(new.title),
            description: Set(new.description),
            image_url: Set(new.image_url),
            creator_id: Set(creator.id),
            signature: Set(new.signature),
            status: Set(LotteryStatus::Pending),
            draw_at: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut prize_models = Vec::with_capacity(prize_inputs.len());
        for prize in prize_inputs {
            let model = prizes::ActiveModel {
                lottery_id: Set(lottery.id),
                level: Set(prize.level),
                name: Set(prize.name.trim().to_string()),
                amount: Set(prize.amount),
                created_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            prize_models.push(model);
        }

        txn.commit().await?;

        log::info!(
            "Lottery {} created by {} with {} prizes",
            code,
            creator_address,
            prize_models.len()
        );

        let mut response = LotteryResponse::new(lottery, creator_address, prize_models, 0);
        response.share_url = Some(self.share_url(&code));
        Ok(response)
    }

    /// 获取抽奖详情（创建者地址、按 level 排序的奖项、参与人数）
    pub async fn get(&self, code: &str) -> AppResult<LotteryResponse> {
        let lottery = self.find_by_code(code).await?;
        let creator = self.load_creator(&lottery).await?;
        let prize_list = load_prizes(&self.pool, lottery.id).await?;
        let participant_count = participants::Entity::find()
            .filter(participants::Column::LotteryId.eq(lottery.id))
            .count(&self.pool)
            .await?;

        Ok(LotteryResponse::new(
            lottery,
            creator.wallet_address,
            prize_list,
            participant_count,
        ))
    }

    /// 抽奖列表（倒序），可按创建者过滤
    pub async fn list(&self, query: &LotteryListQuery) -> AppResult<LotteryPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = lotteries::Entity::find();
        if let Some(creator) = query.creator.as_deref().filter(|c| !c.trim().is_empty()) {
            validate_wallet_address(creator.trim())?;
            let address = normalize_wallet_address(creator);
            match self.user_service.find_by_address(&address).await? {
                Some(user) => {
                    base_query = base_query.filter(lotteries::Column::CreatorId.eq(user.id));
                }
                None => return Ok(PaginatedResponse::new(Vec::new(), &params, 0)),
            }
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by_desc(lotteries::Column::CreatedAt)
            .order_by_desc(lotteries::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<LotterySummaryResponse> = items.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// 报名
    ///
    /// 参与集合的 add 是原子的 "不存在则加入"，同一地址并发报名只会有一个成功；
    /// 未能写入参与记录时回滚集合，已写入的记录不会再被撤销。
    pub async fn join(&self, code: &str, req: AddressRequest) -> AppResult<JoinLotteryResponse> {
        let address = require_wallet_address(req.address.as_deref())?;

        let lottery = self.find_by_code(code).await?;
        ensure_open(&lottery)?;

        let user = self.user_service.ensure_user(&address).await?;
        let member = user.id.to_string();

        if !self.participants.add(&lottery.code, &member).await? {
            return Err(AppError::BadRequest("Already participated".to_string()));
        }

        match self.insert_participant(lottery.id, user.id).await {
            Ok(true) => {}
            Ok(false) => {
                // 报名过程中已被开奖锁定
                self.rollback_member(&lottery.code, &member).await;
                return Err(AppError::BadRequest("Lottery is closed".to_string()));
            }
            Err(AppError::DatabaseError(e)) if is_unique_violation(&e) => {
                // 集合曾丢失（如缓存被清空），数据库记录为准
                log::warn!(
                    "Participation set for {} was missing user {}",
                    lottery.code,
                    user.id
                );
                return Err(AppError::BadRequest("Already participated".to_string()));
            }
            Err(e) => {
                self.rollback_member(&lottery.code, &member).await;
                return Err(e);
            }
        }

        log::info!("User {} joined lottery {}", address, lottery.code);

        Ok(JoinLotteryResponse {
            message: "Joined successfully".to_string(),
        })
    }

    /// 开奖
    ///
    /// 1. 条件更新 PENDING -> DRAWING 抢占，只有一个并发调用能成功
    /// 2. 读取参与集合快照（与数据库参与记录取交集）
    /// 3. 按 level 升序逐个奖项随机抽取，中奖者移出奖池
    /// 4. 写中奖记录 + DRAWING -> COMPLETED 同一事务
    /// 5. 删除参与集合
    pub async fn draw(&self, code: &str, req: AddressRequest) -> AppResult<DrawLotteryResponse> {
        let address = require_wallet_address(req.address.as_deref())?;

        let lottery = self.find_by_code(code).await?;
        let creator = self.load_creator(&lottery).await?;
        if !same_address(&creator.wallet_address, &address) {
            return Err(AppError::AuthError("Not authorized".to_string()));
        }

        if lottery.status != LotteryStatus::Pending {
            return Err(AppError::ValidationError(
                "Invalid lottery status".to_string(),
            ));
        }

        self.claim(lottery.id).await?;
        log::info!("Lottery {} claimed for drawing by {}", lottery.code, address);

        match self.run_draw(&lottery).await {
            Ok(result) => {
                // 已提交，清理失败只记录日志
                if let Err(e) = self.participants.clear(&lottery.code).await {
                    log::error!(
                        "Failed to clear participation set for {}: {e}",
                        lottery.code
                    );
                }
                log::info!(
                    "Lottery {} completed: {} participants, {} winners",
                    lottery.code,
                    result.participants,
                    result.winners
                );
                Ok(result)
            }
            Err(e) => {
                log::error!("Draw failed for lottery {}: {e}", lottery.code);
                self.release_claim(lottery.id).await;
                Err(e)
            }
        }
    }

    /// 中奖名单（仅 COMPLETED）
    pub async fn winners(&self, code: &str) -> AppResult<LotteryWinnersResponse> {
        let lottery = self.find_by_code(code).await?;
        if lottery.status != LotteryStatus::Completed {
            return Err(AppError::ValidationError(
                "Lottery has not been drawn".to_string(),
            ));
        }

        let prize_map: HashMap<i64, prizes::Model> = load_prizes(&self.pool, lottery.id)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let rows = participants::Entity::find()
            .filter(participants::Column::LotteryId.eq(lottery.id))
            .filter(participants::Column::PrizeId.is_not_null())
            .find_also_related(users::Entity)
            .all(&self.pool)
            .await?;

        let mut winners: Vec<WinnerResponse> = rows
            .into_iter()
            .filter_map(|(participant, user)| {
                let prize = prize_map.get(&participant.prize_id?)?;
                Some(WinnerResponse {
                    prize_id: prize.id,
                    level: prize.level,
                    prize_name: prize.name.clone(),
                    wallet_address: user?.wallet_address,
                })
            })
            .collect();
        winners.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.wallet_address.cmp(&b.wallet_address))
        });

        Ok(LotteryWinnersResponse {
            code: lottery.code,
            draw_at: lottery.draw_at,
            winners,
        })
    }

    /// DRAWING 状态停留超过 older_than 的抽奖
    pub async fn find_stale_draws(&self, older_than: Duration) -> AppResult<Vec<lotteries::Model>> {
        let cutoff = Utc::now() - older_than;
        let list = lotteries::Entity::find()
            .filter(lotteries::Column::Status.eq(LotteryStatus::Drawing))
            .filter(lotteries::Column::UpdatedAt.lt(cutoff))
            .order_by_asc(lotteries::Column::UpdatedAt)
            .all(&self.pool)
            .await?;
        Ok(list)
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    fn share_url(&self, code: &str) -> String {
        format!(
            "{}/lottery/{}",
            self.config.share_base_url.trim_end_matches('/'),
            code
        )
    }

    async fn find_by_code(&self, code: &str) -> AppResult<lotteries::Model> {
        let code = code.trim();
        if !is_valid_lottery_code(code) {
            return Err(AppError::NotFound("Lottery not found".to_string()));
        }
        lotteries::Entity::find()
            .filter(lotteries::Column::Code.eq(code))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Lottery not found".to_string()))
    }

    async fn load_creator(&self, lottery: &lotteries::Model) -> AppResult<users::Model> {
        self.user_service
            .find_by_id(lottery.creator_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!("Creator of lottery {} missing", lottery.code))
            })
    }

    /// 在同一事务内确认 PENDING 并写入参与记录
    ///
    /// 先对抽奖行做一次条件更新（不改变任何值）拿到行锁，开奖的 PENDING -> DRAWING
    /// 抢占会等待本事务提交，因此写入的记录要么被开奖看到，要么根本不会写入。
    /// 返回 false 表示抽奖已不是 PENDING。
    async fn insert_participant(&self, lottery_id: i64, user_id: i64) -> AppResult<bool> {
        let txn = self.pool.begin().await?;

        let locked = lotteries::Entity::update_many()
            .col_expr(
                lotteries::Column::UpdatedAt,
                Expr::col(lotteries::Column::UpdatedAt).into(),
            )
            .filter(lotteries::Column::Id.eq(lottery_id))
            .filter(lotteries::Column::Status.eq(LotteryStatus::Pending))
            .exec(&txn)
            .await?;
        if locked.rows_affected != 1 {
            return Ok(false);
        }

        participants::ActiveModel {
            lottery_id: Set(lottery_id),
            user_id: Set(user_id),
            prize_id: Set(None),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(true)
    }

    /// 抢占开奖：仅当库中状态仍为 PENDING 时更新成功
    async fn claim(&self, lottery_id: i64) -> AppResult<()> {
        let result = lotteries::Entity::update_many()
            .col_expr(
                lotteries::Column::Status,
                Expr::value(LotteryStatus::Drawing),
            )
            .col_expr(lotteries::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(lotteries::Column::Id.eq(lottery_id))
            .filter(lotteries::Column::Status.eq(LotteryStatus::Pending))
            .exec(&self.pool)
            .await?;

        if result.rows_affected != 1 {
            return Err(AppError::ValidationError(
                "Invalid lottery status".to_string(),
            ));
        }
        Ok(())
    }

    /// 开奖出错（未提交）时退回 PENDING，允许创建者重试
    async fn release_claim(&self, lottery_id: i64) {
        let result = lotteries::Entity::update_many()
            .col_expr(
                lotteries::Column::Status,
                Expr::value(LotteryStatus::Pending),
            )
            .col_expr(lotteries::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(lotteries::Column::Id.eq(lottery_id))
            .filter(lotteries::Column::Status.eq(LotteryStatus::Drawing))
            .exec(&self.pool)
            .await;

        match result {
            Ok(r) if r.rows_affected == 1 => {
                log::warn!("Lottery {lottery_id} released back to PENDING")
            }
            Ok(_) => {}
            Err(e) => log::error!("Failed to release draw claim of lottery {lottery_id}: {e}"),
        }
    }

    async fn run_draw(&self, lottery: &lotteries::Model) -> AppResult<DrawLotteryResponse> {
        let snapshot = self.participants.members(&lottery.code).await?;

        let joined: HashSet<i64> = participants::Entity::find()
            .select_only()
            .column(participants::Column::UserId)
            .filter(participants::Column::LotteryId.eq(lottery.id))
            .into_tuple::<i64>()
            .all(&self.pool)
            .await?
            .into_iter()
            .collect();

        let mut pool: Vec<i64> = Vec::with_capacity(snapshot.len());
        for member in &snapshot {
            match member.parse::<i64>() {
                Ok(user_id) if joined.contains(&user_id) => pool.push(user_id),
                _ => log::warn!(
                    "Ignoring participation entry {member} of lottery {}",
                    lottery.code
                ),
            }
        }
        pool.sort_unstable();
        pool.dedup();
        let participant_count = pool.len();

        let prize_list = load_prizes(&self.pool, lottery.id).await?;
        let slots: Vec<usize> = prize_list
            .iter()
            .map(|p| usize::try_from(p.amount).unwrap_or(0))
            .collect();

        let groups = {
            let mut rng = rand::thread_rng();
            select_winners(pool, &slots, &mut rng)
        };

        let txn = self.pool.begin().await?;

        let mut winner_count = 0usize;
        for (prize, winners) in prize_list.iter().zip(groups.iter()) {
            if winners.is_empty() {
                continue;
            }
            let result = participants::Entity::update_many()
                .col_expr(participants::Column::PrizeId, Expr::value(prize.id))
                .filter(participants::Column::LotteryId.eq(lottery.id))
                .filter(participants::Column::UserId.is_in(winners.iter().copied()))
                .filter(participants::Column::PrizeId.is_null())
                .exec(&txn)
                .await?;
            winner_count += result.rows_affected as usize;
        }

        let now = Utc::now();
        let finalized = lotteries::Entity::update_many()
            .col_expr(
                lotteries::Column::Status,
                Expr::value(LotteryStatus::Completed),
            )
            .col_expr(lotteries::Column::DrawAt, Expr::value(now))
            .col_expr(lotteries::Column::UpdatedAt, Expr::value(now))
            .filter(lotteries::Column::Id.eq(lottery.id))
            .filter(lotteries::Column::Status.eq(LotteryStatus::Drawing))
            .exec(&txn)
            .await?;

        if finalized.rows_affected != 1 {
            // txn 未提交，drop 时回滚
            return Err(AppError::InternalError(format!(
                "Lottery {} left DRAWING during draw",
                lottery.code
            )));
        }

        txn.commit().await?;

        Ok(DrawLotteryResponse {
            message: "Draw completed".to_string(),
            participants: participant_count,
            winners: winner_count,
        })
    }

    async fn rollback_member(&self, code: &str, member: &str) {
        if let Err(e) = self.participants.remove(code, member).await {
            log::error!("Failed to roll back participation of {member} in {code}: {e}");
        }
    }
}

/// 奖项按 level 升序
async fn load_prizes<C>(db: &C, lottery_id: i64) -> Result<Vec<prizes::Model>, DbErr>
where
    C: ConnectionTrait,
{
    prizes::Entity::find()
        .filter(prizes::Column::LotteryId.eq(lottery_id))
        .order_by_asc(prizes::Column::Level)
        .all(db)
        .await
}

fn ensure_open(lottery: &lotteries::Model) -> AppResult<()> {
    match lottery.status {
        LotteryStatus::Pending => Ok(()),
        LotteryStatus::Completed => Err(AppError::BadRequest("Lottery is completed".to_string())),
        LotteryStatus::Drawing => Err(AppError::BadRequest("Lottery is closed".to_string())),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_create_request(req: &CreateLotteryRequest) -> AppResult<NewLottery> {
    let missing = || AppError::ValidationError("Missing required fields".to_string());

    let title = non_blank(&req.title).ok_or_else(missing)?;
    let description = non_blank(&req.description).ok_or_else(missing)?;
    let signature = non_blank(&req.signature).ok_or_else(missing)?;
    let address = non_blank(&req.address).ok_or_else(missing)?;
    let prize_inputs = req.prizes.as_ref().ok_or_else(missing)?;

    validate_wallet_address(address)
        .map_err(|_| AppError::ValidationError("Invalid wallet address".to_string()))?;

    if title.chars().count() > MAX_NAME_LEN {
        return Err(AppError::ValidationError(format!(
            "Title must be at most {MAX_NAME_LEN} characters"
        )));
    }

    if prize_inputs.is_empty() {
        return Err(AppError::ValidationError(
            "At least one prize is required".to_string(),
        ));
    }
    if prize_inputs.len() > MAX_PRIZES {
        return Err(AppError::ValidationError(format!(
            "At most {MAX_PRIZES} prizes are allowed"
        )));
    }

    let mut levels = HashSet::new();
    for prize in prize_inputs {
        if prize.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Prize name is required".to_string(),
            ));
        }
        if prize.name.trim().chars().count() > MAX_NAME_LEN {
            return Err(AppError::ValidationError(format!(
                "Prize name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if prize.amount < 1 {
            return Err(AppError::ValidationError(
                "Prize amount must be at least 1".to_string(),
            ));
        }
        if !levels.insert(prize.level) {
            return Err(AppError::ValidationError(
                "Prize levels must be unique".to_string(),
            ));
        }
    }

    Ok(NewLottery {
        title: title.to_string(),
        description: description.to_string(),
        image_url: req
            .image_url
            .clone()
            .flatten()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        prizes: prize_inputs.clone(),
        address: address.to_string(),
        signature: signature.to_string(),
    })
}
