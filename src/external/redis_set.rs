use crate::error::AppResult;
use crate::external::participation_set::{ParticipationSet, participants_key};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

/// Redis Set 实现，多实例部署共享同一份参与名单
///
/// SADD 返回新增成员数，天然是原子的 "不存在则加入"。
#[derive(Clone)]
pub struct RedisParticipationSet {
    conn: MultiplexedConnection,
}

impl RedisParticipationSet {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        log::info!("Connected to redis for participation sets");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ParticipationSet for RedisParticipationSet {
    async fn add(&self, code: &str, member: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(participants_key(code), member).await?;
        Ok(added == 1)
    }

    async fn contains(&self, code: &str, member: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.sismember(participants_key(code), member).await?;
        Ok(exists)
    }

    async fn remove(&self, code: &str, member: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.srem(participants_key(code), member).await?;
        Ok(())
    }

    async fn members(&self, code: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(participants_key(code)).await?;
        Ok(members)
    }

    async fn clear(&self, code: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(participants_key(code)).await?;
        Ok(())
    }
}
