use crate::error::AppResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// 参与集合的 key: `lottery:{code}:participants`
pub fn participants_key(code: &str) -> String {
    format!("lottery:{code}:participants")
}

/// 快速参与集合：按抽奖码保存尚未开奖的参与者用户ID
///
/// `add` 必须是原子的 "不存在则加入"，并发重复报名只能有一个返回 true。
#[async_trait]
pub trait ParticipationSet: Send + Sync {
    /// 加入集合，返回是否为新成员
    async fn add(&self, code: &str, member: &str) -> AppResult<bool>;

    async fn contains(&self, code: &str, member: &str) -> AppResult<bool>;

    /// 报名失败时回滚
    async fn remove(&self, code: &str, member: &str) -> AppResult<()>;

    async fn members(&self, code: &str) -> AppResult<Vec<String>>;

    /// 开奖完成后整体删除
    async fn clear(&self, code: &str) -> AppResult<()>;
}

/// 进程内实现，用于未配置 Redis 的单实例部署和测试
#[derive(Default)]
pub struct InMemoryParticipationSet {
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl InMemoryParticipationSet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipationSet for InMemoryParticipationSet {
    async fn add(&self, code: &str, member: &str) -> AppResult<bool> {
        let mut sets = self.sets.lock().await;
        Ok(sets
            .entry(participants_key(code))
            .or_default()
            .insert(member.to_string()))
    }

    async fn contains(&self, code: &str, member: &str) -> AppResult<bool> {
        let sets = self.sets.lock().await;
        Ok(sets
            .get(&participants_key(code))
            .is_some_and(|set| set.contains(member)))
    }

    async fn remove(&self, code: &str, member: &str) -> AppResult<()> {
        let mut sets = self.sets.lock().await;
        let key = participants_key(code);
        if let Some(set) = sets.get_mut(&key) {
            set.remove(member);
            // 与 Redis 行为一致：空集合即不存在
            if set.is_empty() {
                sets.remove(&key);
            }
        }
        Ok(())
    }

    async fn members(&self, code: &str) -> AppResult<Vec<String>> {
        let sets = self.sets.lock().await;
        Ok(sets
            .get(&participants_key(code))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, code: &str) -> AppResult<()> {
        self.sets.lock().await.remove(&participants_key(code));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_participants_key() {
        assert_eq!(participants_key("ABCD2345"), "lottery:ABCD2345:participants");
    }

    #[tokio::test]
    async fn test_add_is_add_if_absent() {
        let set = InMemoryParticipationSet::new();
        assert!(set.add("CODE2345", "1").await.unwrap());
        assert!(!set.add("CODE2345", "1").await.unwrap());
        assert!(set.add("CODE2345", "2").await.unwrap());
        // 不同抽奖互不影响
        assert!(set.add("OTHER234", "1").await.unwrap());

        let mut members = set.members("CODE2345").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let set = InMemoryParticipationSet::new();
        set.add("CODE2345", "1").await.unwrap();
        set.add("CODE2345", "2").await.unwrap();

        set.remove("CODE2345", "1").await.unwrap();
        assert!(!set.contains("CODE2345", "1").await.unwrap());
        assert!(set.contains("CODE2345", "2").await.unwrap());

        set.clear("CODE2345").await.unwrap();
        assert!(set.members("CODE2345").await.unwrap().is_empty());
        // 清理不存在的 key 不报错
        set.clear("MISSING2").await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_member_only_one_wins() {
        let set = Arc::new(InMemoryParticipationSet::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let set = set.clone();
            handles.push(tokio::spawn(
                async move { set.add("RACE2345", "42").await.unwrap() },
            ));
        }

        let mut added = 0;
        for h in handles {
            if h.await.unwrap() {
                added += 1;
            }
        }
        assert_eq!(added, 1);
        assert_eq!(set.members("RACE2345").await.unwrap().len(), 1);
    }
}
