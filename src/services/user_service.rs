use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 按钱包地址获取用户，不存在则创建（address 需已小写）
    pub async fn ensure_user(&self, address: &str) -> AppResult<users::Model> {
        Self::ensure_user_in(&self.pool, address).await
    }

    pub async fn find_by_address(&self, address: &str) -> AppResult<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::WalletAddress.eq(address))
            .one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: i64) -> AppResult<Option<users::Model>> {
        Ok(users::Entity::find_by_id(user_id).one(&self.pool).await?)
    }

    /// 幂等 upsert：INSERT ... ON CONFLICT DO NOTHING 后再读取，并发首次引用同一地址也只会有一条记录
    pub async fn ensure_user_in<C>(db: &C, address: &str) -> AppResult<users::Model>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        users::Entity::insert(users::ActiveModel {
            wallet_address: Set(address.to_string()),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(users::Column::WalletAddress)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

        users::Entity::find()
            .filter(users::Column::WalletAddress.eq(address))
            .one(db)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("User {address} missing after upsert")))
    }
}
